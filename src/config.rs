// config.rs - configuration
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

use clap;
use serde_derive::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::net::IpAddr;
use toml;
use validator::Validate;

use crate::utils::validate_channel;
use crate::utils::validate_username;

#[derive(clap::Parser, Clone)]
#[clap(author, version, about, long_about = None)]
pub(crate) struct Cli {
    #[clap(short, long, help = "Configuration file path")]
    config: Option<String>,
    #[clap(short, long, help = "Listen bind address")]
    listen: Option<IpAddr>,
    #[clap(short, long, help = "Listen port")]
    port: Option<u16>,
    #[clap(short = 'n', long, help = "Server name")]
    name: Option<String>,
    #[clap(short = 'N', long, help = "Network")]
    network: Option<String>,
    #[clap(short, long, arg_enum, help = "Protocol dialect")]
    dialect: Option<Dialect>,
}

// which commands, modes and name grammars are active.
#[derive(
    Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Debug, clap::ArgEnum,
)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Dialect {
    Rfc1459,
    Rfc2810,
    Modern,
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect::Modern
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Rfc1459 => f.write_str("rfc1459"),
            Dialect::Rfc2810 => f.write_str("rfc2810"),
            Dialect::Modern => f.write_str("modern"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub(crate) struct UserModes {
    pub(crate) invisible: bool,
    pub(crate) oper: bool,
    pub(crate) local_oper: bool,
    pub(crate) restricted: bool,
    pub(crate) wallops: bool,
}

impl fmt::Display for UserModes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = '+'.to_string();
        if self.invisible {
            s.push('i');
        }
        if self.oper {
            s.push('o');
        }
        if self.local_oper {
            s.push('O');
        }
        if self.restricted {
            s.push('r');
        }
        if self.wallops {
            s.push('w');
        }
        f.write_str(&s)
    }
}

impl UserModes {
    pub(crate) fn is_local_oper(&self) -> bool {
        self.local_oper || self.oper
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Validate)]
#[serde(default)]
pub(crate) struct ChannelModes {
    pub(crate) ban: Option<HashSet<String>>,
    pub(crate) exception: Option<HashSet<String>>,
    pub(crate) invite_exception: Option<HashSet<String>>,
    pub(crate) client_limit: Option<usize>,
    pub(crate) key: Option<String>,
    pub(crate) operators: Option<HashSet<String>>,
    pub(crate) half_operators: Option<HashSet<String>>,
    pub(crate) voices: Option<HashSet<String>>,
    pub(crate) invite_only: bool,
    pub(crate) moderated: bool,
    pub(crate) secret: bool,
    pub(crate) private: bool,
    pub(crate) protected_topic: bool,
    pub(crate) no_external_messages: bool,
    pub(crate) colorless: bool,
    pub(crate) translate: bool,
}

impl ChannelModes {
    pub(crate) fn new_for_channel(user_nick: String) -> Self {
        let mut def = ChannelModes::default();
        def.operators = Some([user_nick].into());
        def
    }

    pub(crate) fn banned(&self, source: &str) -> bool {
        self.ban
            .as_ref()
            .map_or(false, |b| b.iter().any(|b| crate::utils::match_wildcard(b, source)))
            && (!self
                .exception
                .as_ref()
                .map_or(false, |e| e.iter().any(|e| crate::utils::match_wildcard(e, source))))
    }

    pub(crate) fn rename_user(&mut self, old_nick: &String, nick: String) {
        if let Some(ref mut operators) = self.operators {
            if operators.remove(old_nick) {
                operators.insert(nick.clone());
            }
        }
        if let Some(ref mut half_operators) = self.half_operators {
            if half_operators.remove(old_nick) {
                half_operators.insert(nick.clone());
            }
        }
        if let Some(ref mut voices) = self.voices {
            if voices.remove(old_nick) {
                voices.insert(nick);
            }
        }
    }
}

impl Default for ChannelModes {
    fn default() -> Self {
        ChannelModes {
            ban: None,
            exception: None,
            invite_exception: None,
            client_limit: None,
            key: None,
            operators: None,
            half_operators: None,
            voices: None,
            invite_only: false,
            moderated: false,
            secret: false,
            private: false,
            protected_topic: false,
            no_external_messages: false,
            colorless: false,
            translate: false,
        }
    }
}

impl fmt::Display for ChannelModes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = '+'.to_string();
        if self.invite_only {
            s.push('i');
        }
        if self.moderated {
            s.push('m');
        }
        if self.secret {
            s.push('s');
        }
        if self.private {
            s.push('p');
        }
        if self.protected_topic {
            s.push('t');
        }
        if self.no_external_messages {
            s.push('n');
        }
        if self.colorless {
            s.push('c');
        }
        if self.translate {
            s.push('T');
        }
        if self.key.is_some() {
            s.push('k');
        }
        if self.client_limit.is_some() {
            s.push('l');
        }
        if let Some(ref k) = self.key {
            s.push(' ');
            s += k;
        }
        if let Some(l) = self.client_limit {
            s.push(' ');
            s += &l.to_string();
        }
        if let Some(ref ban) = self.ban {
            ban.iter().for_each(|b| {
                s += " +b ";
                s += b;
            });
        }
        if let Some(ref exception) = self.exception {
            exception.iter().for_each(|e| {
                s += " +e ";
                s += e;
            });
        }
        if let Some(ref invite_exception) = self.invite_exception {
            invite_exception.iter().for_each(|i| {
                s += " +I ";
                s += i;
            });
        }
        if let Some(ref operators) = self.operators {
            operators.iter().for_each(|o| {
                s += " +o ";
                s += o;
            });
        }
        if let Some(ref half_operators) = self.half_operators {
            half_operators.iter().for_each(|h| {
                s += " +h ";
                s += h;
            });
        }
        if let Some(ref voices) = self.voices {
            voices.iter().for_each(|v| {
                s += " +v ";
                s += v;
            });
        }
        f.write_str(&s)
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Validate)]
pub(crate) struct ChannelConfig {
    #[validate(custom = "validate_channel")]
    pub(crate) name: String,
    pub(crate) topic: Option<String>,
    #[validate]
    pub(crate) modes: ChannelModes,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Validate)]
pub(crate) struct OperatorConfig {
    #[validate(custom = "validate_username")]
    pub(crate) name: String,
    #[validate(length(min = 6))]
    pub(crate) password: String,
    pub(crate) mask: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Validate)]
pub(crate) struct UserConfig {
    #[validate(custom = "validate_username")]
    pub(crate) name: String,
    #[validate(custom = "validate_username")]
    pub(crate) nick: String,
    #[validate(length(min = 6))]
    pub(crate) password: Option<String>,
    pub(crate) mask: Option<String>,
}

/// Main configuration structure.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Validate)]
pub(crate) struct MainConfig {
    #[validate(contains = ".")]
    pub(crate) name: String,
    pub(crate) admin_info: String,
    pub(crate) admin_info2: Option<String>,
    pub(crate) admin_email: Option<String>,
    pub(crate) info: String,
    pub(crate) motd: String,
    pub(crate) dialect: Dialect,
    pub(crate) listen: IpAddr,
    pub(crate) ports: Vec<u16>,
    pub(crate) network: String,
    pub(crate) password: Option<String>,
    pub(crate) max_connections: Option<usize>,
    pub(crate) max_joins: Option<usize>,
    pub(crate) max_nickname: usize,
    pub(crate) max_channel_name: usize,
    pub(crate) max_line_length: usize,
    pub(crate) nick_history_size: usize,
    pub(crate) ping_timeout: u64,
    pub(crate) pong_timeout: u64,
    pub(crate) default_user_modes: UserModes,
    #[validate]
    pub(crate) operators: Option<Vec<OperatorConfig>>,
    #[validate]
    pub(crate) users: Option<Vec<UserConfig>>,
    #[validate]
    pub(crate) channels: Option<Vec<ChannelConfig>>,
}

impl MainConfig {
    pub(crate) fn new(cli: Cli) -> Result<MainConfig, Box<dyn Error>> {
        let config_path = cli.config.as_deref().unwrap_or("trircd.toml");
        let mut config_file = File::open(config_path)?;
        let mut config_str = String::new();
        config_file.read_to_string(&mut config_str)?;
        // modify configuration by CLI options
        {
            let mut config: MainConfig = toml::from_str(&config_str)?;
            if let Some(addr) = cli.listen {
                config.listen = addr;
            }
            if let Some(port) = cli.port {
                config.ports = vec![port];
            }
            if let Some(name) = cli.name {
                config.name = name;
            }
            if let Some(network) = cli.network {
                config.network = network;
            }
            if let Some(dialect) = cli.dialect {
                config.dialect = dialect;
            }

            if config.ports.is_empty() {
                return Err(Box::new(clap::error::Error::raw(
                    clap::ErrorKind::ValueValidation,
                    "At least one listen port is required",
                )));
            }
            if let Err(e) = config.validate() {
                Err(Box::new(e))
            } else if !config.validate_nicknames() {
                Err(Box::new(clap::error::Error::raw(
                    clap::ErrorKind::ValueValidation,
                    "Wrong nickname lengths",
                )))
            } else {
                Ok(config)
            }
        }
    }

    fn validate_nicknames(&self) -> bool {
        if let Some(ref users) = self.users {
            users
                .iter()
                .all(|u| u.nick.len() <= self.max_nickname)
        } else {
            true
        }
    }
}

impl Default for MainConfig {
    fn default() -> Self {
        MainConfig {
            name: "irc.irc".to_string(),
            admin_info: "ircadmin is IRC admin".to_string(),
            admin_info2: None,
            admin_email: None,
            info: "This is IRC server".to_string(),
            motd: "Hello, world!".to_string(),
            dialect: Dialect::default(),
            listen: "127.0.0.1".parse().unwrap(),
            ports: vec![6667],
            network: "IRCnetwork".to_string(),
            password: None,
            max_connections: None,
            max_joins: Some(10),
            max_nickname: 20,
            max_channel_name: 50,
            max_line_length: 512,
            nick_history_size: 100,
            ping_timeout: 60,
            pong_timeout: 240,
            default_user_modes: UserModes::default(),
            channels: None,
            operators: None,
            users: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use std::env::temp_dir;
    use std::fs;

    struct TempFileHandle {
        path: String,
    }

    impl TempFileHandle {
        fn new(path: &str) -> TempFileHandle {
            TempFileHandle {
                path: temp_dir().join(path).to_string_lossy().to_string(),
            }
        }
    }

    impl Drop for TempFileHandle {
        fn drop(&mut self) {
            fs::remove_file(self.path.as_str()).unwrap();
        }
    }

    #[test]
    fn test_mainconfig_new() {
        let file_handle = TempFileHandle::new("temp_config.toml");
        let cli = Cli {
            config: Some(file_handle.path.clone()),
            listen: None,
            port: None,
            name: None,
            network: None,
            dialect: None,
        };

        fs::write(
            file_handle.path.as_str(),
            r##"
name = "irci.localhost"
admin_info = "IRCI is local IRC server"
admin_info2 = "IRCI is good server"
info = "This is IRCI server"
motd = "Hello, guys!"
dialect = "rfc2810"
listen = "127.0.0.1"
ports = [ 6667, 6668 ]
network = "IRCInetwork"
password = "bambambam"
max_connections = 4000
max_joins = 10
max_nickname = 20
max_channel_name = 50
max_line_length = 512
nick_history_size = 100
ping_timeout = 100
pong_timeout = 30

[default_user_modes]
invisible = false
oper = false
local_oper = false
restricted = false
wallops = false

[[operators]]
name = "matiszpaki"
password = "fbg9rt0g5rtygh"

[[channels]]
name = "#channel1"
topic = "Some topic"
[channels.modes]
ban = [ 'baddi@*', 'baddi2@*' ]
exception = [ 'bobby@*', 'mati@*' ]
moderated = false
invite_only = false
secret = false
protected_topic = false
no_external_messages = false
"##,
        )
        .unwrap();
        let result = MainConfig::new(cli.clone()).map_err(|e| e.to_string());
        assert_eq!(
            Ok(MainConfig {
                name: "irci.localhost".to_string(),
                admin_info: "IRCI is local IRC server".to_string(),
                admin_info2: Some("IRCI is good server".to_string()),
                admin_email: None,
                info: "This is IRCI server".to_string(),
                motd: "Hello, guys!".to_string(),
                dialect: Dialect::Rfc2810,
                listen: "127.0.0.1".parse().unwrap(),
                ports: vec![6667, 6668],
                network: "IRCInetwork".to_string(),
                password: Some("bambambam".to_string()),
                max_connections: Some(4000),
                max_joins: Some(10),
                max_nickname: 20,
                max_channel_name: 50,
                max_line_length: 512,
                nick_history_size: 100,
                ping_timeout: 100,
                pong_timeout: 30,
                default_user_modes: UserModes::default(),
                operators: Some(vec![OperatorConfig {
                    name: "matiszpaki".to_string(),
                    password: "fbg9rt0g5rtygh".to_string(),
                    mask: None
                }]),
                users: None,
                channels: Some(vec![ChannelConfig {
                    name: "#channel1".to_string(),
                    topic: Some("Some topic".to_string()),
                    modes: ChannelModes {
                        ban: Some(["baddi@*".to_string(), "baddi2@*".to_string()].into()),
                        exception: Some(["bobby@*".to_string(), "mati@*".to_string()].into()),
                        ..ChannelModes::default()
                    },
                }]),
            }),
            result
        );

        // CLI overrides
        let cli2 = Cli {
            config: Some(file_handle.path.clone()),
            listen: Some("192.168.1.4".parse().unwrap()),
            port: Some(6669),
            name: Some("ircer.localhost".to_string()),
            network: Some("SomeNetwork".to_string()),
            dialect: Some(Dialect::Modern),
        };
        let result = MainConfig::new(cli2).unwrap();
        assert_eq!("ircer.localhost", result.name);
        assert_eq!("SomeNetwork", result.network);
        assert_eq!(vec![6669], result.ports);
        assert_eq!(Dialect::Modern, result.dialect);
        assert_eq!(IpAddr::from([192u8, 168, 1, 4]), result.listen);

        // validation failure: server name without dot
        fs::write(
            file_handle.path.as_str(),
            r##"
name = "ircilocalhost"
admin_info = "IRCI is local IRC server"
info = "This is IRCI server"
motd = "Hello, guys!"
dialect = "modern"
listen = "127.0.0.1"
ports = [ 6667 ]
network = "IRCInetwork"
max_nickname = 20
max_channel_name = 50
max_line_length = 512
nick_history_size = 100
ping_timeout = 100
pong_timeout = 30

[default_user_modes]
invisible = false
oper = false
local_oper = false
restricted = false
wallops = false
"##,
        )
        .unwrap();
        assert!(MainConfig::new(cli.clone()).is_err());

        // validation failure: bad channel name
        fs::write(
            file_handle.path.as_str(),
            r##"
name = "irci.localhost"
admin_info = "IRCI is local IRC server"
info = "This is IRCI server"
motd = "Hello, guys!"
dialect = "modern"
listen = "127.0.0.1"
ports = [ 6667 ]
network = "IRCInetwork"
max_nickname = 20
max_channel_name = 50
max_line_length = 512
nick_history_size = 100
ping_timeout = 100
pong_timeout = 30

[default_user_modes]
invisible = false
oper = false
local_oper = false
restricted = false
wallops = false

[[channels]]
name = "^channel2"
topic = "Some topic 2"
[channels.modes]
moderated = true
"##,
        )
        .unwrap();
        assert!(MainConfig::new(cli.clone()).is_err());

        // validation failure: nick longer than max_nickname
        fs::write(
            file_handle.path.as_str(),
            r##"
name = "irci.localhost"
admin_info = "IRCI is local IRC server"
info = "This is IRCI server"
motd = "Hello, guys!"
dialect = "modern"
listen = "127.0.0.1"
ports = [ 6667 ]
network = "IRCInetwork"
max_nickname = 4
max_channel_name = 50
max_line_length = 512
nick_history_size = 100
ping_timeout = 100
pong_timeout = 30

[default_user_modes]
invisible = false
oper = false
local_oper = false
restricted = false
wallops = false

[[users]]
name = "lucas"
nick = "luckboy"
password = "luckyluke"
"##,
        )
        .unwrap();
        assert!(MainConfig::new(cli).is_err());
    }

    #[test]
    fn test_usermodes_to_string() {
        assert_eq!(
            "+oOr".to_string(),
            UserModes {
                invisible: false,
                oper: true,
                local_oper: true,
                restricted: true,
                wallops: false
            }
            .to_string()
        );
        assert_eq!(
            "+irw".to_string(),
            UserModes {
                invisible: true,
                oper: false,
                local_oper: false,
                restricted: true,
                wallops: true
            }
            .to_string()
        );
    }

    #[test]
    fn test_channelmodes_to_string() {
        assert_eq!(
            "+itnl 10 +I somebody +o expert".to_string(),
            ChannelModes {
                invite_exception: Some(["somebody".to_string()].into()),
                client_limit: Some(10),
                operators: Some(["expert".to_string()].into()),
                invite_only: true,
                protected_topic: true,
                no_external_messages: true,
                ..ChannelModes::default()
            }
            .to_string()
        );
        let chm_str = ChannelModes {
            ban: Some(["somebody".to_string(), "somebody2".to_string()].into()),
            key: Some("password".to_string()),
            operators: Some(["expert".to_string()].into()),
            half_operators: Some(["spec".to_string()].into()),
            secret: true,
            protected_topic: true,
            ..ChannelModes::default()
        }
        .to_string();
        assert!(
            "+stk password +b somebody +b somebody2 +o expert +h spec" == chm_str
                || "+stk password +b somebody2 +b somebody +o expert +h spec" == chm_str
        );
        let chm_str = ChannelModes {
            invite_exception: Some(["somebody".to_string()].into()),
            voices: Some(["guy1".to_string(), "guy2".to_string()].into()),
            invite_only: true,
            moderated: true,
            no_external_messages: true,
            ..ChannelModes::default()
        }
        .to_string();
        assert!(
            "+imn +I somebody +v guy1 +v guy2" == chm_str
                || "+imn +I somebody +v guy2 +v guy1" == chm_str
        );
    }

    #[test]
    fn test_channelmodes_banned() {
        let chm = ChannelModes {
            ban: Some(["baddy!*@*".to_string()].into()),
            exception: Some(["baddy!~dad@home.com".to_string()].into()),
            ..ChannelModes::default()
        };
        assert!(chm.banned("baddy!~x@any.where"));
        assert!(!chm.banned("baddy!~dad@home.com"));
        assert!(!chm.banned("goody!~g@any.where"));
    }

    #[test]
    fn test_channelmodes_rename_user() {
        let mut chm = ChannelModes::default();
        chm.operators = Some(["boss".to_string()].into());
        chm.voices = Some(["guy".to_string()].into());
        chm.rename_user(&"boss".to_string(), "bigboss".to_string());
        assert_eq!(Some(["bigboss".to_string()].into()), chm.operators);
        assert_eq!(Some(["guy".to_string()].into()), chm.voices);
        chm.rename_user(&"nobody".to_string(), "somebody".to_string());
        assert_eq!(Some(["bigboss".to_string()].into()), chm.operators);
    }
}
