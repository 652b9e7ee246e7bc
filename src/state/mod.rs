// mod.rs - main state
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

use chrono::prelude::*;
use futures::SinkExt;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::codec::{Framed, LinesCodecError};
use tracing::*;

use crate::command::*;
use crate::config::*;
use crate::modes::*;
use crate::reply::*;
use crate::utils::*;

use Reply::*;

mod structs;
pub(crate) use structs::ConnState;
use structs::*;

pub(crate) struct MainState {
    config: MainConfig,
    modes: ModeRegistry,
    chantypes: ChannelTypeRegistry,
    // key is oper name
    oper_config_idxs: HashMap<String, usize>,
    // key is user name
    user_config_idxs: HashMap<String, usize>,
    conns_count: Arc<AtomicUsize>,
    state: RwLock<VolatileState>,
    created: String,
    start_time: u64,
    restart: AtomicBool,
}

impl MainState {
    pub(crate) fn new_from_config(config: MainConfig) -> MainState {
        let mut user_config_idxs = HashMap::new();
        if let Some(ref users) = config.users {
            users.iter().enumerate().for_each(|(i, u)| {
                user_config_idxs.insert(u.name.clone(), i);
            });
        }
        let mut oper_config_idxs = HashMap::new();
        if let Some(ref opers) = config.operators {
            opers.iter().enumerate().for_each(|(i, o)| {
                oper_config_idxs.insert(o.name.clone(), i);
            });
        }
        let state = RwLock::new(VolatileState::new_from_config(&config));
        let modes = ModeRegistry::new_for_dialect(config.dialect);
        MainState {
            config,
            modes,
            chantypes: ChannelTypeRegistry::new(),
            user_config_idxs,
            oper_config_idxs,
            state,
            conns_count: Arc::new(AtomicUsize::new(0)),
            created: Local::now().to_rfc2822(),
            start_time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs(),
            restart: AtomicBool::new(false),
        }
    }

    pub(super) fn folded(&self, name: &str) -> String {
        casefold_name(self.config.dialect, name)
    }

    pub(crate) fn is_restart_set(&self) -> bool {
        self.restart.load(Ordering::SeqCst)
    }

    pub(crate) fn register_conn_state(
        &self,
        ip_addr: IpAddr,
        stream: Framed<TcpStream, IRCLinesCodec>,
    ) -> Option<ConnState> {
        if let Some(max_conns) = self.config.max_connections {
            if self.conns_count.fetch_add(1, Ordering::SeqCst) < max_conns {
                Some(ConnState::new(ip_addr, stream, self.conns_count.clone()))
            } else {
                self.conns_count.fetch_sub(1, Ordering::SeqCst);
                error!("Too many connections for IP {}", ip_addr);
                None
            }
        } else {
            self.conns_count.fetch_add(1, Ordering::SeqCst);
            Some(ConnState::new(ip_addr, stream, self.conns_count.clone()))
        }
    }

    // remove the user behind a finished connection. fan out the QUIT reason
    // to every channel the user was in, then sweep the graph.
    pub(crate) async fn remove_user(&self, conn_state: &ConnState) {
        if !conn_state.user_state.authenticated {
            return;
        }
        if let Some(ref nick) = conn_state.user_state.nick {
            let fnick = self.folded(nick);
            let mut state = self.state.write().await;
            let reason = conn_state
                .quit_reason
                .clone()
                .unwrap_or_else(|| "Connection closed".to_string());
            let quit_msg = format!("QUIT :{}", reason);
            if let Some(user) = state.users.get(&fnick) {
                let source = user.source.clone();
                let mut notified = HashSet::new();
                for ch in &user.channels {
                    if let Some(chanobj) = state.channels.get(ch) {
                        for n in chanobj.users.keys() {
                            if n != &fnick && notified.insert(n.clone()) {
                                let _ = state
                                    .users
                                    .get(n)
                                    .unwrap()
                                    .send_msg_display(&source, quit_msg.as_str());
                            }
                        }
                    }
                }
            }
            state.remove_user(&fnick);
        }
    }

    pub(crate) async fn process(&self, conn_state: &mut ConnState) -> Result<(), String> {
        // use conversion error to string to avoid problems with thread safety
        let res = self
            .process_internal(conn_state)
            .await
            .map_err(|e| e.to_string());
        conn_state.stream.flush().await.map_err(|e| e.to_string())?;
        res
    }

    pub(crate) async fn get_quit_receiver(
        &self,
    ) -> futures::future::Fuse<oneshot::Receiver<String>> {
        let mut state = self.state.write().await;
        state.quit_receiver.take().unwrap()
    }

    async fn process_internal(&self, conn_state: &mut ConnState) -> Result<(), Box<dyn Error>> {
        tokio::select! {
            Some(msg) = conn_state.receiver.recv() => {
                conn_state.stream.feed(msg).await?;
                Ok(())
            },
            Some(_) = conn_state.ping_receiver.recv() => {
                self.feed_msg(&mut conn_state.stream,
                        format!("PING :{}", self.config.name)).await?;
                // do not rearm the deadline while a pong is already awaited
                if conn_state.pong_notifier.is_none() {
                    conn_state.run_pong_timeout(&self.config);
                }
                Ok(())
            }
            Some(_) = conn_state.timeout_receiver.recv() => {
                info!("Ping timeout for {}", conn_state.user_state.source);
                conn_state.quit_reason = Some("Ping Timeout".to_string());
                self.feed_msg(&mut conn_state.stream,
                            "ERROR :Ping Timeout, connection will be closed.").await?;
                conn_state.quit.store(1, Ordering::SeqCst);
                Ok(())
            }
            Ok((killer, comment)) = &mut conn_state.quit_receiver => {
                if killer.is_empty() {
                    // server-side shutdown
                    conn_state.quit_reason = Some(comment.clone());
                    self.feed_msg(&mut conn_state.stream,
                            format!("ERROR :{}", comment)).await?;
                } else {
                    conn_state.quit_reason =
                            Some(format!("Killed by {}: {}", killer, comment));
                    self.feed_msg(&mut conn_state.stream,
                            format!("ERROR :User killed by {}: {}", killer, comment)).await?;
                }
                conn_state.quit.store(1, Ordering::SeqCst);
                Ok(())
            }
            msg_str_res = conn_state.stream.next() => {

                let msg = match msg_str_res {
                    Some(Ok(ref msg_str)) => {
                        match Message::from_shared_str(msg_str) {
                            Ok(msg) => msg,
                            Err(e) => {
                                match e {
                                    MessageError::Empty => {
                                        self.feed_msg(&mut conn_state.stream,
                                            "ERROR :Empty message").await?;
                                    }
                                    MessageError::WrongSource => {
                                        self.feed_msg(&mut conn_state.stream,
                                            "ERROR :Wrong source").await?;
                                    }
                                    MessageError::NoCommand => {
                                        self.feed_msg(&mut conn_state.stream,
                                            "ERROR :No command supplied").await?;
                                    }
                                }
                                return Err(Box::new(e));
                            }
                        }
                    }
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                        // too long lines are dropped silently
                        debug!("Too long line from {}", conn_state.user_state.source);
                        return Ok(())
                    },
                    Some(Err(e)) => return Err(Box::new(e)),
                    // if end of stream
                    None => {
                        conn_state.quit.store(1, Ordering::SeqCst);
                        return Ok(())
                    }
                };

                // numeric replies belong to server-to-server traffic which is
                // a reserved extension point. drop them.
                if msg.is_numeric() {
                    debug!("Dropping numeric {} from {}", msg.command,
                            conn_state.user_state.source);
                    return Ok(());
                }

                let cmd = match Command::from_message(&msg) {
                    Ok(cmd) => cmd,
                    Err(e) => {
                        use crate::command::CommandError::*;
                        let client = conn_state.user_state.client_name();
                        match e {
                            UnknownCommand(ref cmd_name) => {
                                self.feed_msg(&mut conn_state.stream,
                                        ErrUnknownCommand421{ client,
                                        command: cmd_name }).await?;
                            }
                            UnknownSubcommand(_, _)|ParameterDoesntMatch(_, _)|
                                    WrongParameter(_, _) => {
                                self.feed_msg(&mut conn_state.stream,
                                        format!("ERROR :{}", e)).await?;
                            }
                            NeedMoreParams(command) => {
                                self.feed_msg(&mut conn_state.stream,
                                        ErrNeedMoreParams461{ client,
                                        command: command.name }).await?;
                            }
                            UnknownMode(_, modechar, ref channel) => {
                                self.feed_msg(&mut conn_state.stream,
                                        ErrUnknownMode472{ client,
                                        modechar, channel: channel.as_str() }).await?;
                            }
                            UnknownUModeFlag(_) => {
                                self.feed_msg(&mut conn_state.stream,
                                        ErrUmodeUnknownFlag501{ client })
                                        .await?;
                            }
                            InvalidModeParam{ ref target, modechar, ref param,
                                    ref description } => {
                                self.feed_msg(&mut conn_state.stream,
                                        ErrInvalidModeParam696{ client,
                                        target: target.as_str(), modechar,
                                        param: param.as_str(),
                                        description: description.as_str() }).await?;
                            }
                        }
                        return Err(Box::new(e));
                    }
                };

                // command disabled in the active dialect
                if !cmd.dialect_gate().enabled(self.config.dialect) {
                    self.feed_msg(&mut conn_state.stream, ErrUnknownCommand421{
                            client: conn_state.user_state.client_name(),
                            command: msg.command }).await?;
                    return Ok(());
                }

                // if user not authenticated
                if !conn_state.user_state.authenticated
                        && !cmd.allowed_before_registration() {
                    // NOTICE never triggers an automatic reply
                    if !matches!(cmd, crate::command::Command::NOTICE{ .. }) {
                        self.feed_msg(&mut conn_state.stream, ErrNotRegistered451{
                                    client: conn_state.user_state.client_name() }).await?;
                    }
                    return Ok(())
                }

                // operator gate
                if cmd.oper_only() {
                    let state = self.state.read().await;
                    let is_oper = conn_state.user_state.nick.as_ref()
                        .and_then(|n| state.users.get(&self.folded(n)))
                        .map_or(false, |u| u.modes.is_local_oper());
                    if !is_oper {
                        drop(state);
                        self.feed_msg(&mut conn_state.stream, ErrNoPrivileges481{
                                client: conn_state.user_state.client_name() }).await?;
                        return Ok(());
                    }
                }

                {
                    let mut state = self.state.write().await;
                    let count = state.command_counts
                            .entry(msg.command.to_uppercase()).or_insert(0);
                    *count += 1;
                }

                use crate::command::Command::*;
                match cmd {
                    CAP{ subcommand, caps, version } =>
                        self.process_cap(conn_state, subcommand, caps, version).await,
                    PASS{ password } =>
                        self.process_pass(conn_state, password).await,
                    NICK{ nickname } =>
                        self.process_nick(conn_state, nickname, &msg).await,
                    USER{ username, hostname, servername, realname } =>
                        self.process_user(conn_state, username, hostname,
                                servername, realname).await,
                    SERVER{ name } => self.process_server(conn_state, name).await,
                    SERVICE{ nickname } =>
                        self.process_service(conn_state, nickname).await,
                    PING{ token } => self.process_ping(conn_state, token).await,
                    PONG{ token } => self.process_pong(conn_state, token).await,
                    OPER{ name, password } =>
                        self.process_oper(conn_state, name, password).await,
                    QUIT{ reason } => self.process_quit(conn_state, reason).await,
                    ERROR{ message } => self.process_error(conn_state, message).await,
                    JOIN{ channels, keys } =>
                        self.process_join(conn_state, channels, keys).await,
                    PART{ channels, reason } =>
                        self.process_part(conn_state, channels, reason).await,
                    TOPIC{ channel, topic } =>
                        self.process_topic(conn_state, channel, topic, &msg).await,
                    NAMES{ channels } =>
                        self.process_names(conn_state, channels).await,
                    LIST{ channels, server } =>
                        self.process_list(conn_state, channels, server).await,
                    INVITE{ nickname, channel } =>
                        self.process_invite(conn_state, nickname, channel, &msg).await,
                    KICK{ channel, user, comment } =>
                        self.process_kick(conn_state, channel, user, comment).await,
                    KNOCK{ channel, message } =>
                        self.process_knock(conn_state, channel, message).await,
                    MOTD{ target } =>
                        self.process_motd(conn_state, target).await,
                    VERSION{ target } =>
                        self.process_version(conn_state, target).await,
                    ADMIN{ target } =>
                        self.process_admin(conn_state, target).await,
                    CONNECT{ target_server, port, remote_server } =>
                        self.process_connect(conn_state, target_server, port,
                                remote_server).await,
                    LUSERS{ } => self.process_lusers(conn_state).await,
                    TIME{ server } =>
                        self.process_time(conn_state, server).await,
                    STATS{ query, server } =>
                        self.process_stats(conn_state, query, server).await,
                    LINKS{ remote_server, server_mask } =>
                        self.process_links(conn_state, remote_server, server_mask).await,
                    TRACE{ target } => self.process_trace(conn_state, target).await,
                    INFO{ } => self.process_info(conn_state).await,
                    MODE{ target, modes } =>
                        self.process_mode(conn_state, target, modes).await,
                    PRIVMSG{ targets, text } =>
                        self.process_privmsg(conn_state, targets, text).await,
                    NOTICE{ targets, text } =>
                        self.process_notice(conn_state, targets, text).await,
                    SERVLIST{ mask, servtype } =>
                        self.process_servlist(conn_state, mask, servtype).await,
                    SQUERY{ servicename, text } =>
                        self.process_squery(conn_state, servicename, text).await,
                    WHO{ mask } => self.process_who(conn_state, mask).await,
                    WHOIS{ target, nickmasks } =>
                        self.process_whois(conn_state, target, nickmasks).await,
                    WHOWAS{ nickname, count, server } =>
                        self.process_whowas(conn_state, nickname, count, server).await,
                    KILL{ nickname, comment } =>
                        self.process_kill(conn_state, nickname, comment).await,
                    DIE{ } => self.process_die(conn_state).await,
                    REHASH{ } => self.process_rehash(conn_state).await,
                    RESTART{ } => self.process_restart(conn_state).await,
                    SQUIT{ server, comment } =>
                        self.process_squit(conn_state, server, comment).await,
                    AWAY{ text } =>
                        self.process_away(conn_state, text).await,
                    ISON{ nicknames } =>
                        self.process_ison(conn_state, nicknames).await,
                    USERHOST{ nicknames } =>
                        self.process_userhost(conn_state, nicknames).await,
                    WALLOPS{ text } =>
                        self.process_wallops(conn_state, text, &msg).await,
                    SUMMON{ user } => self.process_summon(conn_state, user).await,
                    SILENCE{ mask } => self.process_silence(conn_state, mask).await,
                    LANGUAGE{ langs } =>
                        self.process_language(conn_state, langs).await,
                }
            },
        }
    }

    async fn feed_msg<T: fmt::Display>(
        &self,
        stream: &mut Framed<TcpStream, IRCLinesCodec>,
        t: T,
    ) -> Result<(), LinesCodecError> {
        stream.feed(format!(":{} {}", self.config.name, t)).await
    }

    async fn feed_msg_source<T: fmt::Display>(
        &self,
        stream: &mut Framed<TcpStream, IRCLinesCodec>,
        source: &str,
        t: T,
    ) -> Result<(), LinesCodecError> {
        stream.feed(format!(":{} {}", source, t)).await
    }
}

pub(crate) async fn user_state_process(
    main_state: Arc<MainState>,
    stream: TcpStream,
    addr: SocketAddr,
) {
    let line_stream = Framed::new(
        stream,
        IRCLinesCodec::new_with_max_length(main_state.config.max_line_length),
    );
    if let Some(mut conn_state) = main_state.register_conn_state(addr.ip(), line_stream) {
        while !conn_state.is_quit() {
            if let Err(e) = main_state.process(&mut conn_state).await {
                error!("Error for {}: {}", conn_state.user_state.source, e);
            }
        }
        main_state.remove_user(&conn_state).await;
    }
}

pub(crate) async fn run_server(
    config: MainConfig,
) -> Result<(Arc<MainState>, JoinHandle<()>, Vec<u16>), Box<dyn Error>> {
    let mut listeners = vec![];
    let mut bound_ports = vec![];
    for port in &config.ports {
        let listener = TcpListener::bind((config.listen, *port)).await?;
        bound_ports.push(listener.local_addr()?.port());
        listeners.push(listener);
    }
    info!(
        "Listening on {} port(s) {:?} ({} dialect)",
        config.listen, bound_ports, config.dialect
    );
    let main_state = Arc::new(MainState::new_from_config(config));
    let main_state_to_return = main_state.clone();
    let handle = tokio::spawn(async move {
        let mut quit_receiver = main_state.get_quit_receiver().await;
        let mut accept_tasks = vec![];
        for listener in listeners {
            let accept_main_state = main_state.clone();
            accept_tasks.push(tokio::spawn(async move {
                loop {
                    match listener.accept().await {
                        Ok((stream, addr)) => {
                            tokio::spawn(user_state_process(
                                accept_main_state.clone(),
                                stream,
                                addr,
                            ));
                        }
                        Err(e) => {
                            error!("Accept connection error: {}", e);
                        }
                    }
                }
            }));
        }
        if let Ok(msg) = (&mut quit_receiver).await {
            info!("Server quit: {}", msg);
        }
        for task in accept_tasks {
            task.abort();
        }
    });
    Ok((main_state_to_return, handle, bound_ports))
}


mod channel_cmds;
mod conn_cmds;
mod rest_cmds;
mod srv_query_cmds;
