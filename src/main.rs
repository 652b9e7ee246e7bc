// main.rs - main program
//
// trircd - IRC server for three protocol dialects
// Copyright (C) 2024  trircd team
//
// This library is free software; you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public
// License as published by the Free Software Foundation; either
// version 2.1 of the License, or (at your option) any later version.
//
// This library is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this library; if not, write to the Free Software
// Foundation, Inc., 51 Franklin Street, Fifth Floor, Boston, MA  02110-1301  USA

use clap::Parser;
use std::error::Error;
use tracing::info;

mod command;
mod config;
mod modes;
mod reply;
mod state;
mod utils;

use config::{Cli, MainConfig};
use state::run_server;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    loop {
        // RESTART re-reads the configuration file.
        let config = MainConfig::new(cli.clone())?;
        let (main_state, handle, _) = run_server(config).await?;
        handle.await?;
        if !main_state.is_restart_set() {
            break;
        }
        info!("Restarting server");
    }
    Ok(())
}
