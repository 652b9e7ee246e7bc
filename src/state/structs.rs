// structs.rs - structures of main state
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

use flagset::{flags, FlagSet};
use futures::{future::Fuse, future::FutureExt};
use std::collections::{HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::ops::Drop;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::TcpStream;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::time;
use tokio_util::codec::Framed;
use tracing::*;

use crate::command::*;
use crate::config::*;
use crate::utils::*;

#[derive(Debug)]
pub(super) struct User {
    pub(super) hostname: String,
    pub(super) sender: UnboundedSender<String>,
    // quit_sender - used by KILL command.
    pub(super) quit_sender: Option<oneshot::Sender<(String, String)>>,
    pub(super) name: String,
    pub(super) realname: String,
    // nick in the form the user chose it. index keys are case-folded.
    pub(super) nick: String,
    pub(super) source: String, // IRC source for mask matching
    pub(super) modes: UserModes,
    // the user matched an entry from the configuration.
    pub(super) registered: bool,
    pub(super) away: Option<String>,
    // case-folded channel names.
    pub(super) channels: HashSet<String>,
    pub(super) invited_to: HashSet<String>, // invited in channels
    pub(super) silence: Vec<String>,
    pub(super) last_activity: u64,
    pub(super) signon: u64,
    pub(super) history_entry: NickHistoryEntry,
}

impl User {
    pub(super) fn new(
        config: &MainConfig,
        user_state: &ConnUserState,
        sender: UnboundedSender<String>,
        quit_sender: oneshot::Sender<(String, String)>,
    ) -> User {
        let user_modes = config.default_user_modes;
        let now_ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let nick = user_state.nick.as_ref().unwrap().clone();
        User {
            hostname: user_state.hostname.clone(),
            sender,
            quit_sender: Some(quit_sender),
            name: user_state.name.as_ref().unwrap().clone(),
            realname: user_state.realname.as_ref().unwrap().clone(),
            nick: nick.clone(),
            source: user_state.source.clone(),
            modes: user_modes,
            registered: user_state.registered,
            away: None,
            channels: HashSet::new(),
            invited_to: HashSet::new(),
            silence: vec![],
            last_activity: now_ts,
            signon: now_ts,
            history_entry: NickHistoryEntry {
                nick,
                username: user_state.name.as_ref().unwrap().clone(),
                hostname: user_state.hostname.clone(),
                realname: user_state.realname.as_ref().unwrap().clone(),
                signon: now_ts,
            },
        }
    }

    // update nick - mainly source
    pub(super) fn update_nick(&mut self, user_state: &ConnUserState) {
        if let Some(ref nick) = user_state.nick {
            self.nick = nick.clone();
            self.history_entry.nick = nick.clone();
        }
        self.source = user_state.source.clone();
    }

    pub(super) fn send_message(
        &self,
        msg: &Message<'_>,
        source: &str,
    ) -> Result<(), SendError<String>> {
        self.sender.send(msg.to_string_with_source(source))
    }

    pub(super) fn send_msg_display<T: std::fmt::Display>(
        &self,
        source: &str,
        t: T,
    ) -> Result<(), SendError<String>> {
        self.sender.send(format!(":{} {}", source, t))
    }

    // whether a sender with this source is on the user's silence list.
    pub(super) fn is_silencing(&self, source: &str) -> bool {
        self.silence.iter().any(|m| match_wildcard(m, source))
    }
}

#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub(super) struct ChannelUserModes {
    pub(super) operator: bool,
    pub(super) half_oper: bool,
    pub(super) voice: bool,
}

impl ChannelUserModes {
    pub(super) fn new_for_created_channel() -> Self {
        ChannelUserModes {
            operator: true,
            half_oper: false,
            voice: false,
        }
    }

    pub(super) fn is_operator(&self) -> bool {
        self.operator
    }
    pub(super) fn is_half_operator(&self) -> bool {
        self.operator || self.half_oper
    }
    pub(super) fn is_voice(&self) -> bool {
        self.operator || self.half_oper || self.voice
    }

    // highest rank prefix only.
    pub(super) fn prefix(&self) -> String {
        if self.operator {
            "@".to_string()
        } else if self.half_oper {
            "%".to_string()
        } else if self.voice {
            "+".to_string()
        } else {
            String::new()
        }
    }
}

flags! {
    pub(super) enum PrivMsgTargetType: u8 {
        Channel = 0b1,
        ChannelOper = 0b10,
        ChannelHalfOper = 0b100,
        ChannelVoice = 0b1000,
        ChannelAll = 0b1111,
        ChannelAllSpecial = 0b1110,
    }
}

// get target type for PRIVMSG and channel name
pub(super) fn get_privmsg_target_type(target: &str) -> (FlagSet<PrivMsgTargetType>, &str) {
    use PrivMsgTargetType::*;
    let mut out = Channel.into();
    let mut out_str = "";
    for (i, c) in target.bytes().enumerate() {
        match c {
            b'@' => out |= Channel | ChannelOper,
            b'%' => out |= Channel | ChannelHalfOper,
            b'+' => out |= Channel | ChannelVoice,
            b'#' => {
                if i + 1 < target.len() {
                    out_str = &target[i..];
                } else {
                    out &= !ChannelAll;
                }
                break;
            }
            _ => {
                out &= !ChannelAll;
                break;
            }
        }
    }
    (out, out_str)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ChannelTopic {
    pub(super) topic: String,
    pub(super) nick: String,
    pub(super) set_time: u64,
}

impl ChannelTopic {
    pub(super) fn new(topic: String) -> Self {
        ChannelTopic {
            topic,
            nick: String::new(),
            set_time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs(),
        }
    }

    pub(super) fn new_with_nick(topic: String, nick: String) -> Self {
        ChannelTopic {
            topic,
            nick,
            set_time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct BanInfo {
    pub(super) set_time: u64,
    pub(super) who: String,
}

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub(super) struct ChannelDefaultModes {
    pub(super) operators: HashSet<String>,
    pub(super) half_operators: HashSet<String>,
    pub(super) voices: HashSet<String>,
}

impl ChannelDefaultModes {
    // create new channel default modes from ChannelModes and clean up this ChannelModes.
    pub(super) fn new_from_modes_and_cleanup(modes: &mut ChannelModes) -> Self {
        ChannelDefaultModes {
            operators: modes.operators.take().unwrap_or_default(),
            half_operators: modes.half_operators.take().unwrap_or_default(),
            voices: modes.voices.take().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Channel {
    // display name. the channels index key is the case-folded form.
    pub(super) name: String,
    pub(super) topic: Option<ChannelTopic>,
    pub(super) modes: ChannelModes,
    pub(super) default_modes: ChannelDefaultModes,
    pub(super) ban_info: HashMap<String, BanInfo>,
    // keyed by case-folded nick.
    pub(super) users: HashMap<String, ChannelUserModes>,
    pub(super) creation_time: u64,
    // if channel is preconfigured - it comes from configuration
    pub(super) preconfigured: bool,
}

impl Channel {
    pub(super) fn new_on_user_join(name: String, user_nick: String) -> Channel {
        let mut users = HashMap::new();
        users.insert(user_nick.clone(), ChannelUserModes::new_for_created_channel());
        Channel {
            name,
            topic: None,
            ban_info: HashMap::new(),
            default_modes: ChannelDefaultModes::default(),
            modes: ChannelModes::new_for_channel(user_nick),
            users,
            creation_time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs(),
            preconfigured: false,
        }
    }

    pub(super) fn add_user(&mut self, user_nick: &String) {
        let mut chum = ChannelUserModes::default();
        // apply default modes for user in channel
        if self.default_modes.operators.contains(user_nick) {
            chum.operator = true;
            let mut ops = self.modes.operators.take().unwrap_or_default();
            ops.insert(user_nick.clone());
            self.modes.operators = Some(ops);
        }
        if self.default_modes.half_operators.contains(user_nick) {
            chum.half_oper = true;
            let mut half_ops = self.modes.half_operators.take().unwrap_or_default();
            half_ops.insert(user_nick.clone());
            self.modes.half_operators = Some(half_ops);
        }
        if self.default_modes.voices.contains(user_nick) {
            chum.voice = true;
            let mut voices = self.modes.voices.take().unwrap_or_default();
            voices.insert(user_nick.clone());
            self.modes.voices = Some(voices);
        }
        self.users.insert(user_nick.clone(), chum);
    }

    pub(super) fn rename_user(&mut self, old_nick: &String, nick: String) {
        let oldchumode = self.users.remove(old_nick).unwrap();
        self.users.insert(nick.clone(), oldchumode);
        self.modes.rename_user(old_nick, nick);
    }

    // remove user from channel - and from lists
    pub(super) fn remove_user(&mut self, nick: &str) {
        self.remove_operator(nick);
        self.remove_half_operator(nick);
        self.remove_voice(nick);
        self.users.remove(nick);
    }

    // add/remove user from list
    pub(super) fn add_operator(&mut self, nick: &str) {
        let mut ops = self.modes.operators.take().unwrap_or_default();
        ops.insert(nick.to_string());
        self.modes.operators = Some(ops);
        self.users.get_mut(nick).unwrap().operator = true;
    }
    pub(super) fn remove_operator(&mut self, nick: &str) {
        let mut ops = self.modes.operators.take().unwrap_or_default();
        ops.remove(nick);
        self.modes.operators = Some(ops);
        self.users.get_mut(nick).unwrap().operator = false;
    }
    pub(super) fn add_half_operator(&mut self, nick: &str) {
        let mut half_ops = self.modes.half_operators.take().unwrap_or_default();
        half_ops.insert(nick.to_string());
        self.modes.half_operators = Some(half_ops);
        self.users.get_mut(nick).unwrap().half_oper = true;
    }
    pub(super) fn remove_half_operator(&mut self, nick: &str) {
        let mut half_ops = self.modes.half_operators.take().unwrap_or_default();
        half_ops.remove(nick);
        self.modes.half_operators = Some(half_ops);
        self.users.get_mut(nick).unwrap().half_oper = false;
    }
    pub(super) fn add_voice(&mut self, nick: &str) {
        let mut voices = self.modes.voices.take().unwrap_or_default();
        voices.insert(nick.to_string());
        self.modes.voices = Some(voices);
        self.users.get_mut(nick).unwrap().voice = true;
    }
    pub(super) fn remove_voice(&mut self, nick: &str) {
        let mut voices = self.modes.voices.take().unwrap_or_default();
        voices.remove(nick);
        self.modes.voices = Some(voices);
        self.users.get_mut(nick).unwrap().voice = false;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct NickHistoryEntry {
    pub(super) nick: String,
    pub(super) username: String,
    pub(super) hostname: String,
    pub(super) realname: String,
    pub(super) signon: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConnUserState {
    pub(super) ip_addr: IpAddr,
    pub(super) hostname: String,
    pub(super) name: Option<String>,
    pub(super) realname: Option<String>,
    pub(super) nick: Option<String>,
    pub(super) source: String, // IRC source for mask matching
    pub(super) password: Option<String>,
    pub(super) authenticated: bool,
    pub(super) registered: bool,
}

impl ConnUserState {
    pub(super) fn new(ip_addr: IpAddr) -> ConnUserState {
        let mut source = "@".to_string();
        source.push_str(&ip_addr.to_string());
        ConnUserState {
            ip_addr,
            hostname: ip_addr.to_string(),
            name: None,
            realname: None,
            nick: None,
            source,
            password: None,
            authenticated: false,
            registered: false,
        }
    }

    pub(super) fn client_name(&self) -> &str {
        if let Some(ref n) = self.nick {
            n
        } else if let Some(ref n) = self.name {
            n
        } else {
            "*"
        }
    }

    pub(super) fn update_source(&mut self) {
        let mut s = String::new();
        // generate source - nick!username@host
        if let Some(ref nick) = self.nick {
            s.push_str(nick);
            s.push('!');
        }
        if let Some(ref name) = self.name {
            s.push('~'); // username is defined by user itself
            s.push_str(name);
        }
        s.push('@');
        s.push_str(&self.hostname);
        self.source = s;
    }

    pub(super) fn set_name(&mut self, name: String) {
        self.name = Some(name);
        self.update_source();
    }
    pub(super) fn set_nick(&mut self, nick: String) {
        self.nick = Some(nick);
        self.update_source();
    }
}

#[derive(Debug)]
pub(crate) struct ConnState {
    pub(super) stream: Framed<TcpStream, IRCLinesCodec>,
    pub(super) sender: Option<UnboundedSender<String>>,
    pub(super) receiver: UnboundedReceiver<String>,
    // sender and receiver used by the ping waker task.
    pub(super) ping_sender: Option<UnboundedSender<()>>,
    // ping_receiver - process method receives ping and sends ping to client.
    pub(super) ping_receiver: UnboundedReceiver<()>,
    // timeout_sender - sender to send timeout - it will be sent by pong_client_timeout
    pub(super) timeout_sender: Arc<UnboundedSender<()>>,
    // timeout_receiver - process method receives that
    pub(super) timeout_receiver: UnboundedReceiver<()>,
    pub(super) pong_notifier: Option<oneshot::Sender<()>>,
    // quit receiver - receive KILL from other user.
    pub(super) quit_receiver: Fuse<oneshot::Receiver<(String, String)>>,
    // quit_sender - quit sender to send KILL - sender will be later taken after
    // correct registration and it will be stored in User structure.
    pub(super) quit_sender: Option<oneshot::Sender<(String, String)>>,

    pub(super) user_state: ConnUserState,

    pub(super) caps_negotation: bool, // if caps negotation process
    pub(super) quit: Arc<AtomicI32>,
    // reason announced to shared channels when this connection goes away.
    pub(super) quit_reason: Option<String>,
    pub(super) conns_count: Arc<AtomicUsize>,
}

impl ConnState {
    pub(super) fn new(
        ip_addr: IpAddr,
        stream: Framed<TcpStream, IRCLinesCodec>,
        conns_count: Arc<AtomicUsize>,
    ) -> ConnState {
        let (sender, receiver) = unbounded_channel();
        let (ping_sender, ping_receiver) = unbounded_channel();
        let (timeout_sender, timeout_receiver) = unbounded_channel();
        let (quit_sender, quit_receiver) = oneshot::channel();

        ConnState {
            stream,
            sender: Some(sender),
            receiver,
            user_state: ConnUserState::new(ip_addr),
            ping_sender: Some(ping_sender),
            ping_receiver,
            timeout_sender: Arc::new(timeout_sender),
            timeout_receiver,
            pong_notifier: None,
            quit_sender: Some(quit_sender),
            quit_receiver: quit_receiver.fuse(),
            caps_negotation: false,
            quit: Arc::new(AtomicI32::new(0)),
            quit_reason: None,
            conns_count,
        }
    }

    pub(crate) fn is_quit(&self) -> bool {
        self.quit.load(Ordering::SeqCst) != 0
    }

    pub(super) fn run_ping_waker(&mut self, config: &MainConfig) {
        if self.ping_sender.is_some() {
            tokio::spawn(ping_client_waker(
                Duration::from_secs(config.ping_timeout),
                self.quit.clone(),
                self.ping_sender.take().unwrap(),
            ));
        }
    }

    // run pong timeout process - that sends timeout after some time.
    pub(super) fn run_pong_timeout(&mut self, config: &MainConfig) {
        let (pong_notifier, pong_receiver) = oneshot::channel();
        self.pong_notifier = Some(pong_notifier);
        tokio::spawn(pong_client_timeout(
            time::timeout(Duration::from_secs(config.pong_timeout), pong_receiver),
            self.quit.clone(),
            self.timeout_sender.clone(),
        ));
    }
}

impl Drop for ConnState {
    fn drop(&mut self) {
        self.conns_count.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn ping_client_waker(d: Duration, quit: Arc<AtomicI32>, sender: UnboundedSender<()>) {
    time::sleep(d).await;
    let mut intv = time::interval(d);
    while quit.load(Ordering::SeqCst) == 0 {
        intv.tick().await;
        if sender.send(()).is_err() {
            break;
        }
    }
}

async fn pong_client_timeout(
    tmo: time::Timeout<oneshot::Receiver<()>>,
    quit: Arc<AtomicI32>,
    sender: Arc<UnboundedSender<()>>,
) {
    if tmo.await.is_err() {
        // do not send if client already quits from IRC server.
        if quit.load(Ordering::SeqCst) == 0 {
            let _ = sender.send(());
        }
    }
}

pub(super) struct VolatileState {
    pub(super) dialect: Dialect,
    pub(super) users: HashMap<String, User>,
    pub(super) channels: HashMap<String, Channel>,
    pub(super) wallops_users: HashSet<String>,
    pub(super) invisible_users_count: usize,
    pub(super) operators_count: usize,
    pub(super) max_users_count: usize,
    // bounded ring of past nicks read by WHOWAS, newest at the back.
    pub(super) nick_history: VecDeque<NickHistoryEntry>,
    pub(super) history_size: usize,
    pub(super) command_counts: HashMap<String, u64>,
    pub(super) quit_sender: Option<oneshot::Sender<String>>,
    pub(super) quit_receiver: Option<Fuse<oneshot::Receiver<String>>>,
}

impl VolatileState {
    pub(super) fn new_from_config(config: &MainConfig) -> VolatileState {
        let dialect = config.dialect;
        let mut channels = HashMap::new();
        if let Some(ref cfg_channels) = config.channels {
            // create new channels from configuration
            cfg_channels.iter().for_each(|c| {
                let mut ch_modes = c.modes.clone();
                // rank lists from the configuration are folded into index keys
                for ranks in [
                    &mut ch_modes.operators,
                    &mut ch_modes.half_operators,
                    &mut ch_modes.voices,
                ] {
                    if let Some(rs) = ranks.take() {
                        *ranks =
                            Some(rs.iter().map(|n| casefold_name(dialect, n)).collect());
                    }
                }
                let def_ch_modes = ChannelDefaultModes::new_from_modes_and_cleanup(&mut ch_modes);

                channels.insert(
                    casefold_name(dialect, &c.name),
                    Channel {
                        name: c.name.clone(),
                        topic: c.topic.as_ref().map(|x| ChannelTopic::new(x.clone())),
                        ban_info: HashMap::new(),
                        default_modes: def_ch_modes,
                        modes: ch_modes,
                        users: HashMap::new(),
                        creation_time: SystemTime::now()
                            .duration_since(UNIX_EPOCH)
                            .unwrap()
                            .as_secs(),
                        preconfigured: true,
                    },
                );
            });
        }

        let (quit_sender, quit_receiver) = oneshot::channel();
        VolatileState {
            dialect,
            users: HashMap::new(),
            channels,
            wallops_users: HashSet::new(),
            invisible_users_count: 0,
            operators_count: 0,
            max_users_count: 0,
            nick_history: VecDeque::new(),
            history_size: config.nick_history_size,
            command_counts: HashMap::new(),
            quit_sender: Some(quit_sender),
            quit_receiver: Some(quit_receiver.fuse()),
        }
    }

    pub(super) fn folded(&self, name: &str) -> String {
        casefold_name(self.dialect, name)
    }

    // add user to volatile state - includes stats likes invisible users count, etc.
    pub(super) fn add_user(&mut self, user: User) {
        let unick = self.folded(&user.nick);
        if user.modes.invisible {
            self.invisible_users_count += 1;
        }
        if user.modes.wallops {
            self.wallops_users.insert(unick.clone());
        }
        if user.modes.is_local_oper() {
            self.operators_count += 1;
        }
        self.users.insert(unick, user);
        if self.users.len() > self.max_users_count {
            self.max_users_count = self.users.len();
        }
    }

    // remove user from channel and remove channel from user.
    // remove same channel if no more users at channel.
    pub(super) fn remove_user_from_channel(&mut self, channel: &str, nick: &str) {
        if let Some(chanobj) = self.channels.get_mut(channel) {
            chanobj.remove_user(nick);
            if chanobj.users.is_empty() && !chanobj.preconfigured {
                info!("Channel {} has been removed", channel);
                self.channels.remove(channel);
            }
        }
        if let Some(user) = self.users.get_mut(nick) {
            user.channels.remove(channel);
        }
    }

    // remove user - including stats like invisible users. takes the folded nick.
    pub(super) fn remove_user(&mut self, nick: &str) {
        if let Some(user) = self.users.remove(nick) {
            if user.modes.is_local_oper() {
                self.operators_count -= 1;
            }
            if user.modes.invisible {
                self.invisible_users_count -= 1;
            }
            self.wallops_users.remove(nick);
            user.channels.iter().for_each(|chname| {
                if let Some(chanobj) = self.channels.get_mut(chname) {
                    chanobj.remove_user(nick);
                    if chanobj.users.is_empty() && !chanobj.preconfigured {
                        self.channels.remove(chname);
                    }
                }
            });
            self.insert_to_nick_history(user.history_entry);
        }
    }

    // used to maintain nick history that is read by WHOWAS command.
    pub(super) fn insert_to_nick_history(&mut self, nhe: NickHistoryEntry) {
        if self.history_size == 0 {
            return;
        }
        if self.nick_history.len() >= self.history_size {
            self.nick_history.pop_front();
        }
        self.nick_history.push_back(nhe);
    }
}
