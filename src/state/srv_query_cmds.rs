// srv_query_cmds.rs - server query and mode commands
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

use super::*;
use crate::modes::SetterRank;
use std::error::Error;
use std::ops::DerefMut;
use std::time::{SystemTime, UNIX_EPOCH};

impl super::MainState {
    pub(super) async fn process_motd<'a>(
        &self,
        conn_state: &mut ConnState,
        target: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();

        if target.is_some() {
            self.feed_msg(
                &mut conn_state.stream,
                ErrUnknownError400 {
                    client,
                    command: "MOTD",
                    subcommand: None,
                    info: "Server unsupported",
                },
            )
            .await?;
            return Ok(());
        }
        if self.config.motd.is_empty() {
            self.feed_msg(&mut conn_state.stream, ErrNoMotd422 { client })
                .await?;
            return Ok(());
        }
        self.feed_msg(
            &mut conn_state.stream,
            RplMotdStart375 {
                client,
                server: &self.config.name,
            },
        )
        .await?;
        for line in self.config.motd.lines() {
            self.feed_msg(&mut conn_state.stream, RplMotd372 { client, motd: line })
                .await?;
        }
        self.feed_msg(&mut conn_state.stream, RplEndOfMotd376 { client })
            .await?;
        Ok(())
    }

    pub(super) async fn process_version<'a>(
        &self,
        conn_state: &mut ConnState,
        target: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        if target.is_some() {
            self.feed_msg(
                &mut conn_state.stream,
                ErrUnknownError400 {
                    client,
                    command: "VERSION",
                    subcommand: None,
                    info: "Server unsupported",
                },
            )
            .await?;
        } else {
            self.feed_msg(
                &mut conn_state.stream,
                RplVersion351 {
                    client,
                    version: concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION")),
                    server: &self.config.name,
                    comments: &self.config.info,
                },
            )
            .await?;
        }
        Ok(())
    }

    pub(super) async fn process_admin<'a>(
        &self,
        conn_state: &mut ConnState,
        target: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        if target.is_some() {
            self.feed_msg(
                &mut conn_state.stream,
                ErrUnknownError400 {
                    client,
                    command: "ADMIN",
                    subcommand: None,
                    info: "Server unsupported",
                },
            )
            .await?;
            return Ok(());
        }
        self.feed_msg(
            &mut conn_state.stream,
            RplAdminMe256 {
                client,
                server: &self.config.name,
            },
        )
        .await?;
        self.feed_msg(
            &mut conn_state.stream,
            RplAdminLoc1257 {
                client,
                info: &self.config.admin_info,
            },
        )
        .await?;
        if let Some(ref info2) = self.config.admin_info2 {
            self.feed_msg(&mut conn_state.stream, RplAdminLoc2258 { client, info: info2 })
                .await?;
        }
        if let Some(ref email) = self.config.admin_email {
            self.feed_msg(&mut conn_state.stream, RplAdminEmail259 { client, email })
                .await?;
        }
        Ok(())
    }

    // linking is a reserved extension point.
    pub(super) async fn process_connect<'a>(
        &self,
        conn_state: &mut ConnState,
        target_server: &'a str,
        _: Option<u16>,
        _: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        self.feed_msg(
            &mut conn_state.stream,
            ErrNoSuchServer402 {
                client,
                server: target_server,
            },
        )
        .await?;
        Ok(())
    }

    pub(super) async fn process_lusers(
        &self,
        conn_state: &mut ConnState,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        let state = self.state.read().await;
        let conns = self.conns_count.load(std::sync::atomic::Ordering::SeqCst);
        let unknowns = conns.saturating_sub(state.users.len());

        self.feed_msg(
            &mut conn_state.stream,
            RplLUserClient251 {
                client,
                users_num: state.users.len(),
                inv_users_num: state.invisible_users_count,
                servers_num: 1,
            },
        )
        .await?;
        self.feed_msg(
            &mut conn_state.stream,
            RplLUserOp252 {
                client,
                ops_num: state.operators_count,
            },
        )
        .await?;
        self.feed_msg(
            &mut conn_state.stream,
            RplLUserUnknown253 {
                client,
                conns_num: unknowns,
            },
        )
        .await?;
        self.feed_msg(
            &mut conn_state.stream,
            RplLUserChannels254 {
                client,
                channels_num: state.channels.len(),
            },
        )
        .await?;
        self.feed_msg(
            &mut conn_state.stream,
            RplLUserMe255 {
                client,
                clients_num: state.users.len(),
                servers_num: 1,
            },
        )
        .await?;
        self.feed_msg(
            &mut conn_state.stream,
            RplLocalUsers265 {
                client,
                clients_num: state.users.len(),
                max_clients_num: state.max_users_count,
            },
        )
        .await?;
        self.feed_msg(
            &mut conn_state.stream,
            RplGlobalUsers266 {
                client,
                clients_num: state.users.len(),
                max_clients_num: state.max_users_count,
            },
        )
        .await?;
        Ok(())
    }

    pub(super) async fn process_time<'a>(
        &self,
        conn_state: &mut ConnState,
        server: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        if server.is_some() {
            self.feed_msg(
                &mut conn_state.stream,
                ErrUnknownError400 {
                    client,
                    command: "TIME",
                    subcommand: None,
                    info: "Server unsupported",
                },
            )
            .await?;
        } else {
            let now = Local::now();
            self.feed_msg(
                &mut conn_state.stream,
                RplTime391 {
                    client,
                    server: &self.config.name,
                    timestamp: now.timestamp() as u64,
                    ts_offset: "0",
                    human_readable: &now.to_rfc2822(),
                },
            )
            .await?;
        }
        Ok(())
    }

    pub(super) async fn process_stats<'a>(
        &self,
        conn_state: &mut ConnState,
        query: char,
        server: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        if server.is_some() {
            self.feed_msg(
                &mut conn_state.stream,
                ErrUnknownError400 {
                    client,
                    command: "STATS",
                    subcommand: None,
                    info: "Server unsupported",
                },
            )
            .await?;
            return Ok(());
        }
        match query {
            'u' => {
                let uptime = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap()
                    .as_secs()
                    - self.start_time;
                self.feed_msg(
                    &mut conn_state.stream,
                    RplStatsUptime242 {
                        client,
                        seconds: uptime,
                    },
                )
                .await?;
            }
            'm' => {
                let state = self.state.read().await;
                let mut counts: Vec<(&String, &u64)> = state.command_counts.iter().collect();
                counts.sort();
                for (command, count) in counts {
                    self.feed_msg(
                        &mut conn_state.stream,
                        RplStatsCommands212 {
                            client,
                            command,
                            count: *count,
                        },
                    )
                    .await?;
                }
            }
            _ => {}
        }
        self.feed_msg(&mut conn_state.stream, RplEndOfStats219 { client, stat: query })
            .await?;
        Ok(())
    }

    pub(super) async fn process_links<'a>(
        &self,
        conn_state: &mut ConnState,
        _: Option<&'a str>,
        server_mask: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        let mask = server_mask.unwrap_or("*");
        // no links - only the end marker
        self.feed_msg(&mut conn_state.stream, RplEndOfLinks365 { client, mask })
            .await?;
        Ok(())
    }

    pub(super) async fn process_trace<'a>(
        &self,
        conn_state: &mut ConnState,
        _: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        self.feed_msg(
            &mut conn_state.stream,
            RplTraceEnd262 {
                client,
                server: &self.config.name,
            },
        )
        .await?;
        Ok(())
    }

    pub(super) async fn process_info(
        &self,
        conn_state: &mut ConnState,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        self.feed_msg(
            &mut conn_state.stream,
            RplInfo371 {
                client,
                info: concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION")),
            },
        )
        .await?;
        self.feed_msg(
            &mut conn_state.stream,
            RplInfo371 {
                client,
                info: &self.config.info,
            },
        )
        .await?;
        self.feed_msg(&mut conn_state.stream, RplEndOfInfo374 { client })
            .await?;
        Ok(())
    }

    pub(super) async fn process_servlist<'a>(
        &self,
        conn_state: &mut ConnState,
        mask: Option<&'a str>,
        servtype: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        // no services are running here
        self.feed_msg(
            &mut conn_state.stream,
            RplServListEnd235 {
                client,
                mask: mask.unwrap_or("*"),
                servtype: servtype.unwrap_or("0"),
            },
        )
        .await?;
        Ok(())
    }

    pub(super) async fn process_squery<'a>(
        &self,
        conn_state: &mut ConnState,
        servicename: &'a str,
        _: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        self.feed_msg(
            &mut conn_state.stream,
            ErrNoSuchNick401 {
                client,
                nick: servicename,
            },
        )
        .await?;
        Ok(())
    }

    async fn process_mode_channel<'a>(
        &self,
        conn_state: &mut ConnState,
        state: &mut VolatileState,
        target: &'a str,
        chname: &str,
        modes: Vec<(&'a str, Vec<&'a str>)>,
        chum: ChannelUserModes,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name().to_string();

        if modes.is_empty() {
            let chanobj = state.channels.get(chname).unwrap();
            self.feed_msg(
                &mut conn_state.stream,
                RplChannelModeIs324 {
                    client: &client,
                    channel: target,
                    modestring: &chanobj.modes.to_string(),
                },
            )
            .await?;
            self.feed_msg(
                &mut conn_state.stream,
                RplCreationTime329 {
                    client: &client,
                    channel: target,
                    creation_time: chanobj.creation_time,
                },
            )
            .await?;
            return Ok(());
        }

        // accumulated and applied changes for the final fan-out
        let mut applied: Vec<(bool, char, Option<String>)> = vec![];

        for (mchars, margs) in modes {
            let mut margs_it = margs.iter();
            let mut mode_set = false;
            for mchar in mchars.chars() {
                match mchar {
                    '+' => mode_set = true,
                    '-' => mode_set = false,
                    'o' | 'v' | 'h' => {
                        let arg = margs_it.next().unwrap();
                        if self.modes.rank_mode(mchar).is_none() {
                            self.feed_msg(
                                &mut conn_state.stream,
                                ErrUnknownMode472 {
                                    client: &client,
                                    modechar: mchar,
                                    channel: target,
                                },
                            )
                            .await?;
                            continue;
                        }
                        if !chum.is_operator() {
                            self.feed_msg(
                                &mut conn_state.stream,
                                ErrChanOpPrivsNeeded482 {
                                    client: &client,
                                    channel: target,
                                },
                            )
                            .await?;
                            continue;
                        }
                        let arg_nick = state.folded(arg);
                        let chanobj = state.channels.get_mut(chname).unwrap();
                        if !chanobj.users.contains_key(&arg_nick) {
                            self.feed_msg(
                                &mut conn_state.stream,
                                ErrUserNotInChannel441 {
                                    client: &client,
                                    nick: arg,
                                    channel: target,
                                },
                            )
                            .await?;
                            continue;
                        }
                        match (mchar, mode_set) {
                            ('o', true) => chanobj.add_operator(&arg_nick),
                            ('o', false) => chanobj.remove_operator(&arg_nick),
                            ('h', true) => chanobj.add_half_operator(&arg_nick),
                            ('h', false) => chanobj.remove_half_operator(&arg_nick),
                            ('v', true) => chanobj.add_voice(&arg_nick),
                            ('v', false) => chanobj.remove_voice(&arg_nick),
                            _ => (),
                        }
                        applied.push((mode_set, mchar, Some(arg.to_string())));
                    }
                    'b' | 'e' | 'I' => {
                        let mode_def = match self.modes.channel_mode(mchar) {
                            Some(d) => *d,
                            None => {
                                margs_it.next();
                                self.feed_msg(
                                    &mut conn_state.stream,
                                    ErrUnknownMode472 {
                                        client: &client,
                                        modechar: mchar,
                                        channel: target,
                                    },
                                )
                                .await?;
                                continue;
                            }
                        };
                        if let Some(mask) = margs_it.next() {
                            let rank_ok = match mode_def.setter_rank {
                                SetterRank::Op => chum.is_operator(),
                                SetterRank::HalfOp => chum.is_half_operator(),
                            };
                            if !rank_ok {
                                self.feed_msg(
                                    &mut conn_state.stream,
                                    ErrChanOpPrivsNeeded482 {
                                        client: &client,
                                        channel: target,
                                    },
                                )
                                .await?;
                                continue;
                            }
                            let norm_mask = normalize_sourcemask(mask);
                            let chanobj = state.channels.get_mut(chname).unwrap();
                            let list = match mchar {
                                'b' => &mut chanobj.modes.ban,
                                'e' => &mut chanobj.modes.exception,
                                _ => &mut chanobj.modes.invite_exception,
                            };
                            let mut masks = list.take().unwrap_or_default();
                            if mode_set {
                                masks.insert(norm_mask.clone());
                            } else {
                                masks.remove(&norm_mask);
                            }
                            *list = Some(masks);
                            if mchar == 'b' {
                                if mode_set {
                                    chanobj.ban_info.insert(
                                        norm_mask.clone(),
                                        BanInfo {
                                            who: conn_state
                                                .user_state
                                                .nick
                                                .as_ref()
                                                .unwrap()
                                                .to_string(),
                                            set_time: SystemTime::now()
                                                .duration_since(UNIX_EPOCH)
                                                .unwrap()
                                                .as_secs(),
                                        },
                                    );
                                } else {
                                    chanobj.ban_info.remove(&norm_mask);
                                }
                            }
                            applied.push((mode_set, mchar, Some(norm_mask)));
                        } else {
                            // no parameter - enumerate the list
                            let chanobj = state.channels.get(chname).unwrap();
                            match mchar {
                                'b' => {
                                    if let Some(ref ban) = chanobj.modes.ban {
                                        for b in ban {
                                            if let Some(ban_info) = chanobj.ban_info.get(b) {
                                                self.feed_msg(
                                                    &mut conn_state.stream,
                                                    RplBanList367 {
                                                        client: &client,
                                                        channel: target,
                                                        mask: b,
                                                        who: &ban_info.who,
                                                        set_ts: ban_info.set_time,
                                                    },
                                                )
                                                .await?;
                                            } else {
                                                self.feed_msg(
                                                    &mut conn_state.stream,
                                                    RplBanList367 {
                                                        client: &client,
                                                        channel: target,
                                                        mask: b,
                                                        who: "",
                                                        set_ts: 0,
                                                    },
                                                )
                                                .await?;
                                            }
                                        }
                                    }
                                    self.feed_msg(
                                        &mut conn_state.stream,
                                        RplEndOfBanList368 {
                                            client: &client,
                                            channel: target,
                                        },
                                    )
                                    .await?;
                                }
                                'e' => {
                                    if let Some(ref exception) = chanobj.modes.exception {
                                        for e in exception {
                                            self.feed_msg(
                                                &mut conn_state.stream,
                                                RplExceptList348 {
                                                    client: &client,
                                                    channel: target,
                                                    mask: e,
                                                },
                                            )
                                            .await?;
                                        }
                                    }
                                    self.feed_msg(
                                        &mut conn_state.stream,
                                        RplEndOfExceptList349 {
                                            client: &client,
                                            channel: target,
                                        },
                                    )
                                    .await?;
                                }
                                _ => {
                                    if let Some(ref inv_ex) = chanobj.modes.invite_exception {
                                        for e in inv_ex {
                                            self.feed_msg(
                                                &mut conn_state.stream,
                                                RplInviteList346 {
                                                    client: &client,
                                                    channel: target,
                                                    mask: e,
                                                },
                                            )
                                            .await?;
                                        }
                                    }
                                    self.feed_msg(
                                        &mut conn_state.stream,
                                        RplEndOfInviteList347 {
                                            client: &client,
                                            channel: target,
                                        },
                                    )
                                    .await?;
                                }
                            }
                        }
                    }
                    'l' => {
                        let arg = if mode_set { margs_it.next() } else { None };
                        if !chum.is_operator() {
                            self.feed_msg(
                                &mut conn_state.stream,
                                ErrChanOpPrivsNeeded482 {
                                    client: &client,
                                    channel: target,
                                },
                            )
                            .await?;
                            continue;
                        }
                        let chanobj = state.channels.get_mut(chname).unwrap();
                        if mode_set {
                            let arg = arg.unwrap();
                            chanobj.modes.client_limit = Some(arg.parse::<usize>().unwrap());
                            applied.push((true, 'l', Some(arg.to_string())));
                        } else {
                            chanobj.modes.client_limit = None;
                            applied.push((false, 'l', None));
                        }
                    }
                    'k' => {
                        let arg = if mode_set { margs_it.next() } else { None };
                        if !chum.is_operator() {
                            self.feed_msg(
                                &mut conn_state.stream,
                                ErrChanOpPrivsNeeded482 {
                                    client: &client,
                                    channel: target,
                                },
                            )
                            .await?;
                            continue;
                        }
                        let chanobj = state.channels.get_mut(chname).unwrap();
                        if mode_set {
                            let arg = arg.unwrap();
                            chanobj.modes.key = Some(arg.to_string());
                            applied.push((true, 'k', Some(arg.to_string())));
                        } else {
                            chanobj.modes.key = None;
                            applied.push((false, 'k', None));
                        }
                    }
                    c => {
                        if self.modes.channel_mode(c).is_none() {
                            self.feed_msg(
                                &mut conn_state.stream,
                                ErrUnknownMode472 {
                                    client: &client,
                                    modechar: c,
                                    channel: target,
                                },
                            )
                            .await?;
                            continue;
                        }
                        if !chum.is_operator() {
                            self.feed_msg(
                                &mut conn_state.stream,
                                ErrChanOpPrivsNeeded482 {
                                    client: &client,
                                    channel: target,
                                },
                            )
                            .await?;
                            continue;
                        }
                        let chanobj = state.channels.get_mut(chname).unwrap();
                        match c {
                            'i' => chanobj.modes.invite_only = mode_set,
                            'm' => chanobj.modes.moderated = mode_set,
                            't' => chanobj.modes.protected_topic = mode_set,
                            'n' => chanobj.modes.no_external_messages = mode_set,
                            's' => chanobj.modes.secret = mode_set,
                            'p' => chanobj.modes.private = mode_set,
                            'c' => chanobj.modes.colorless = mode_set,
                            'T' => chanobj.modes.translate = mode_set,
                            _ => (),
                        }
                        applied.push((mode_set, c, None));
                    }
                }
            }
        }

        // fan applied changes out to the channel
        if !applied.is_empty() {
            let mut mode_string = String::new();
            let mut mode_args = vec![];
            let mut last_set: Option<bool> = None;
            for (set, c, arg) in applied {
                if last_set != Some(set) {
                    mode_string.push(if set { '+' } else { '-' });
                    last_set = Some(set);
                }
                mode_string.push(c);
                if let Some(a) = arg {
                    mode_args.push(a);
                }
            }
            let mut mode_msg = format!("MODE {} {}", target, mode_string);
            for a in &mode_args {
                mode_msg.push(' ');
                mode_msg.push_str(a);
            }
            let chanobj = state.channels.get(chname).unwrap();
            for nick in chanobj.users.keys() {
                state
                    .users
                    .get(nick)
                    .unwrap()
                    .send_msg_display(&conn_state.user_state.source, mode_msg.as_str())?;
            }
        }
        Ok(())
    }

    async fn process_mode_user<'a>(
        &self,
        conn_state: &mut ConnState,
        state: &mut VolatileState,
        target: &'a str,
        fnick: &str,
        modes: Vec<(&'a str, Vec<&'a str>)>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name().to_string();

        if modes.is_empty() {
            let user = state.users.get(fnick).unwrap();
            self.feed_msg(
                &mut conn_state.stream,
                RplUModeIs221 {
                    client: &client,
                    user_modes: &user.modes.to_string(),
                },
            )
            .await?;
            return Ok(());
        }

        let mut set_modes_string = String::new();
        let mut unset_modes_string = String::new();
        for (mchars, _) in modes {
            let mut mode_set = false;
            for mchar in mchars.chars() {
                match mchar {
                    '+' => mode_set = true,
                    '-' => mode_set = false,
                    'i' => {
                        let user = state.users.get_mut(fnick).unwrap();
                        if mode_set {
                            if !user.modes.invisible {
                                user.modes.invisible = true;
                                state.invisible_users_count += 1;
                                set_modes_string.push('i');
                            }
                        } else if user.modes.invisible {
                            user.modes.invisible = false;
                            state.invisible_users_count -= 1;
                            unset_modes_string.push('i');
                        }
                    }
                    'r' => {
                        let user = state.users.get_mut(fnick).unwrap();
                        if mode_set {
                            if !user.modes.restricted {
                                user.modes.restricted = true;
                                set_modes_string.push('r');
                            }
                        } else if user.modes.restricted {
                            // restriction may not be lifted by its owner
                            self.feed_msg(
                                &mut conn_state.stream,
                                ErrYourConnRestricted484 { client: &client },
                            )
                            .await?;
                        }
                    }
                    'w' => {
                        let user = state.users.get_mut(fnick).unwrap();
                        if mode_set {
                            if !user.modes.wallops {
                                user.modes.wallops = true;
                                state.wallops_users.insert(fnick.to_string());
                                set_modes_string.push('w');
                            }
                        } else if user.modes.wallops {
                            user.modes.wallops = false;
                            state.wallops_users.remove(fnick);
                            unset_modes_string.push('w');
                        }
                    }
                    'o' | 'O' => {
                        let user = state.users.get_mut(fnick).unwrap();
                        if mode_set {
                            // operator privileges come from OPER only
                            if !user.modes.is_local_oper() {
                                self.feed_msg(
                                    &mut conn_state.stream,
                                    ErrNoPrivileges481 { client: &client },
                                )
                                .await?;
                            }
                        } else if user.modes.is_local_oper() {
                            user.modes.oper = false;
                            user.modes.local_oper = false;
                            state.operators_count -= 1;
                            unset_modes_string.push(mchar);
                        }
                    }
                    _ => (),
                }
            }
        }

        if !set_modes_string.is_empty() || !unset_modes_string.is_empty() {
            let mut mode_string = String::new();
            if !set_modes_string.is_empty() {
                mode_string.push('+');
                mode_string += &set_modes_string;
            }
            if !unset_modes_string.is_empty() {
                mode_string.push('-');
                mode_string += &unset_modes_string;
            }
            self.feed_msg_source(
                &mut conn_state.stream,
                &conn_state.user_state.source,
                format!("MODE {} {}", target, mode_string),
            )
            .await?;
        }
        Ok(())
    }

    pub(super) async fn process_mode<'a>(
        &self,
        conn_state: &mut ConnState,
        target: &'a str,
        modes: Vec<(&'a str, Vec<&'a str>)>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        let user_nick = self.folded(conn_state.user_state.nick.as_ref().unwrap());
        let mut statem = self.state.write().await;
        let state = statem.deref_mut();

        if self.chantypes.is_channel_name(target) {
            // channel
            let chtype = self
                .chantypes
                .by_prefix(target.chars().next().unwrap())
                .unwrap();
            if !chtype.supports_modes {
                self.feed_msg(
                    &mut conn_state.stream,
                    ErrNoSuchChannel403 {
                        client,
                        channel: target,
                    },
                )
                .await?;
                return Ok(());
            }
            let chname = state.folded(target);
            if state.channels.contains_key(&chname) {
                let chum = state
                    .channels
                    .get(&chname)
                    .unwrap()
                    .users
                    .get(&user_nick)
                    .copied()
                    .unwrap_or_default();
                self.process_mode_channel(conn_state, state, target, &chname, modes, chum)
                    .await?;
            } else {
                self.feed_msg(
                    &mut conn_state.stream,
                    ErrNoSuchChannel403 {
                        client,
                        channel: target,
                    },
                )
                .await?;
            }
        } else {
            // user
            let ftarget = state.folded(target);
            if user_nick == ftarget {
                self.process_mode_user(conn_state, state, target, &user_nick, modes)
                    .await?;
            } else if state.users.contains_key(&ftarget) {
                self.feed_msg(&mut conn_state.stream, ErrUsersDontMatch502 { client })
                    .await?;
            } else {
                self.feed_msg(
                    &mut conn_state.stream,
                    ErrNoSuchNick401 {
                        client,
                        nick: target,
                    },
                )
                .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::super::test::*;
    use super::*;

    #[tokio::test]
    async fn test_command_motd() {
        let mut config = MainConfig::default();
        config.motd = "Welcome to our network!\nBe nice.".to_string();
        let (main_state, handle, port) = run_test_server(config).await;
        {
            let mut line_stream = login_to_test_and_skip(port, "moty", "moty", "Moty").await;
            line_stream.send("MOTD".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc 375 moty :- irc.irc Message of the day - ".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 372 moty :Welcome to our network!".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 372 moty :Be nice.".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 376 moty :End of /MOTD command.".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            line_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_lusers() {
        let (main_state, handle, port) = run_test_server(MainConfig::default()).await;
        {
            let mut line_stream = login_to_test_and_skip(port, "lucky", "luck", "Lucky").await;
            line_stream.send("LUSERS".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc 251 lucky :There are 1 users and 0 invisible on 1 servers"
                    .to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 252 lucky 0 :operator(s) online".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 253 lucky 0 :unknown connection(s)".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 254 lucky 0 :channels formed".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 255 lucky :I have 1 clients and 1 servers".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 265 lucky 1 1 :Current local users 1, max 1".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 266 lucky 1 1 :Current global users 1, max 1".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            line_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_version_info_time() {
        let (main_state, handle, port) = run_test_server(MainConfig::default()).await;
        {
            let mut line_stream = login_to_test_and_skip(port, "query", "query", "Query").await;
            line_stream.send("VERSION".to_string()).await.unwrap();
            assert_eq!(
                concat!(
                    ":irc.irc 351 query ",
                    env!("CARGO_PKG_NAME"),
                    "-",
                    env!("CARGO_PKG_VERSION"),
                    " irc.irc :This is IRC server"
                )
                .to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            line_stream.send("INFO".to_string()).await.unwrap();
            assert_eq!(
                concat!(
                    ":irc.irc 371 query :",
                    env!("CARGO_PKG_NAME"),
                    " ",
                    env!("CARGO_PKG_VERSION")
                )
                .to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 371 query :This is IRC server".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 374 query :End of INFO list".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            line_stream.send("TIME".to_string()).await.unwrap();
            assert!(line_stream
                .next()
                .await
                .unwrap()
                .unwrap()
                .starts_with(":irc.irc 391 query irc.irc "));
            line_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_stats() {
        let (main_state, handle, port) = run_test_server(MainConfig::default()).await;
        {
            let mut line_stream = login_to_test_and_skip(port, "nosy", "nosy", "Nosy").await;
            line_stream.send("STATS u".to_string()).await.unwrap();
            assert!(line_stream
                .next()
                .await
                .unwrap()
                .unwrap()
                .starts_with(":irc.irc 242 nosy :Server Up "));
            assert_eq!(
                ":irc.irc 219 nosy u :End of STATS report".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );

            line_stream.send("STATS m".to_string()).await.unwrap();
            // NICK, USER and the first STATS were counted
            let mut lines = vec![];
            loop {
                let line = line_stream.next().await.unwrap().unwrap();
                if line.contains(" 219 ") {
                    break;
                }
                lines.push(line);
            }
            assert!(lines.contains(&":irc.irc 212 nosy NICK 1".to_string()));
            assert!(lines.contains(&":irc.irc 212 nosy USER 1".to_string()));
            assert!(lines.contains(&":irc.irc 212 nosy STATS 2".to_string()));
            line_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_mode_channel() {
        let (main_state, handle, port) = run_test_server(MainConfig::default()).await;
        {
            let mut alice_stream = login_to_test_and_skip(port, "alice", "alice", "Alice").await;
            let mut bob_stream = login_to_test_and_skip(port, "bob", "bob", "Bob").await;
            alice_stream.send("JOIN #room".to_string()).await.unwrap();
            for _ in 0..4 {
                alice_stream.next().await.unwrap().unwrap();
            }
            bob_stream.send("JOIN #room".to_string()).await.unwrap();
            for _ in 0..4 {
                bob_stream.next().await.unwrap().unwrap();
            }
            alice_stream.next().await.unwrap().unwrap(); // bob's join

            // mode display
            alice_stream.send("MODE #room".to_string()).await.unwrap();
            let mode_line = alice_stream.next().await.unwrap().unwrap();
            assert!(mode_line.starts_with(":irc.irc 324 alice #room "));
            assert!(alice_stream
                .next()
                .await
                .unwrap()
                .unwrap()
                .starts_with(":irc.irc 329 alice #room "));

            // bob cannot change modes
            bob_stream.send("MODE #room +m".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc 482 bob #room :You're not channel operator".to_string(),
                bob_stream.next().await.unwrap().unwrap()
            );

            // mode change fans out to every member
            alice_stream
                .send("MODE #room +mn".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":alice!~alice@127.0.0.1 MODE #room +mn".to_string(),
                alice_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":alice!~alice@127.0.0.1 MODE #room +mn".to_string(),
                bob_stream.next().await.unwrap().unwrap()
            );

            // rank change with parameter
            alice_stream
                .send("MODE #room +v bob".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":alice!~alice@127.0.0.1 MODE #room +v bob".to_string(),
                alice_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":alice!~alice@127.0.0.1 MODE #room +v bob".to_string(),
                bob_stream.next().await.unwrap().unwrap()
            );
            {
                let state = main_state.state.read().await;
                let channel = state.channels.get("#room").unwrap();
                assert!(channel.users.get("bob").unwrap().voice);
                assert!(channel.modes.moderated);
                assert!(channel.modes.no_external_messages);
            }

            // rank change for somebody not in channel
            alice_stream
                .send("MODE #room +o missing".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":irc.irc 441 alice missing #room :They aren't on that channel".to_string(),
                alice_stream.next().await.unwrap().unwrap()
            );

            // ban list set and enumerate
            alice_stream
                .send("MODE #room +b evil".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":alice!~alice@127.0.0.1 MODE #room +b evil!*@*".to_string(),
                alice_stream.next().await.unwrap().unwrap()
            );
            bob_stream.next().await.unwrap().unwrap();
            alice_stream
                .send("MODE #room +b".to_string())
                .await
                .unwrap();
            let ban_line = alice_stream.next().await.unwrap().unwrap();
            assert!(ban_line.starts_with(":irc.irc 367 alice #room evil!*@* alice "));
            assert_eq!(
                ":irc.irc 368 alice #room :End of channel ban list".to_string(),
                alice_stream.next().await.unwrap().unwrap()
            );

            alice_stream.send("QUIT :Bye".to_string()).await.unwrap();
            bob_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_mode_dialect_gating() {
        let mut config = MainConfig::default();
        config.dialect = Dialect::Rfc1459;
        let (main_state, handle, port) = run_test_server(config).await;
        {
            let mut line_stream = login_to_test_and_skip(port, "older", "older", "Older").await;
            line_stream.send("JOIN #past".to_string()).await.unwrap();
            for _ in 0..4 {
                line_stream.next().await.unwrap().unwrap();
            }
            // half-op rank does not exist under rfc1459
            line_stream
                .send("MODE #past +h older".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":irc.irc 472 older h :is unknown mode char for #past".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            // neither do ban exceptions
            line_stream
                .send("MODE #past +e someone".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":irc.irc 472 older e :is unknown mode char for #past".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            line_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_mode_user() {
        let (main_state, handle, port) = run_test_server(MainConfig::default()).await;
        {
            let mut line_stream = login_to_test_and_skip(port, "umode", "umode", "U Mode").await;
            line_stream.send("MODE umode".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc 221 umode +".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            line_stream
                .send("MODE umode +iw".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":umode!~umode@127.0.0.1 MODE umode +iw".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            {
                let state = main_state.state.read().await;
                let user = state.users.get("umode").unwrap();
                assert!(user.modes.invisible && user.modes.wallops);
                assert_eq!(1, state.invisible_users_count);
                assert!(state.wallops_users.contains("umode"));
            }
            // another user's modes are off limits
            let mut other_stream = login_to_test_and_skip(port, "other", "other", "Other").await;
            other_stream
                .send("MODE umode +i".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":irc.irc 502 other :Cant change mode for other users".to_string(),
                other_stream.next().await.unwrap().unwrap()
            );
            // becoming an operator through MODE is not possible
            line_stream
                .send("MODE umode +o".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":irc.irc 481 umode :Permission Denied- You're not an IRC operator".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            line_stream.send("QUIT :Bye".to_string()).await.unwrap();
            other_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_servlist_squery() {
        let (main_state, handle, port) = run_test_server(MainConfig::default()).await;
        {
            let mut line_stream = login_to_test_and_skip(port, "servy", "servy", "Servy").await;
            line_stream.send("SERVLIST".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc 235 servy * 0 :End of service listing".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            line_stream
                .send("SQUERY irchelp :HELP topic".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":irc.irc 401 servy irchelp :No such nick/channel".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            line_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_links_trace_connect() {
        let (main_state, handle, port) = run_test_server(MainConfig::default()).await;
        {
            let mut line_stream = login_to_test_and_skip(port, "hops", "hops", "Hops").await;
            line_stream.send("LINKS".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc 365 hops * :End of LINKS list".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            line_stream.send("TRACE".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc 262 hops irc.irc :End of TRACE".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            line_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }
}
