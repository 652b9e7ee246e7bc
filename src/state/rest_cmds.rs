// rest_cmds.rs - rest of commands
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
use std::error::Error;
use std::iter::FromIterator;
use std::time::{SystemTime, UNIX_EPOCH};

// mIRC color code. a colorless channel rejects messages carrying it.
const COLOR_CODE: char = '\x03';

// maximal number of entries in one silence list.
const SILENCE_LIST_SIZE: usize = 15;

impl super::MainState {
    async fn process_privmsg_notice<'a>(
        &self,
        conn_state: &mut ConnState,
        targets: Vec<&'a str>,
        text: &'a str,
        notice: bool,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        let user_nick = self.folded(conn_state.user_state.nick.as_ref().unwrap());

        let mut something_done = false;
        {
            let state = self.state.read().await;

            for target in HashSet::<&&str>::from_iter(targets.iter()) {
                let msg_str = if notice {
                    format!("NOTICE {} :{}", target, text)
                } else {
                    format!("PRIVMSG {} :{}", target, text)
                };
                let (target_type, chan_str) = get_privmsg_target_type(target);
                if target_type.contains(PrivMsgTargetType::Channel) {
                    // to channel
                    let chname = state.folded(chan_str);
                    if let Some(chanobj) = state.channels.get(&chname) {
                        let chanuser_mode = chanobj.users.get(&user_nick);
                        // no external messages
                        let can_send = {
                            if !chanobj.modes.no_external_messages || chanuser_mode.is_some() {
                                true
                            } else {
                                if !notice {
                                    self.feed_msg(
                                        &mut conn_state.stream,
                                        ErrCannotSendToChan404 {
                                            client,
                                            channel: chan_str,
                                        },
                                    )
                                    .await?;
                                }
                                false
                            }
                        };
                        // moderated channel needs at least a voice
                        let can_send = can_send && {
                            if !chanobj.modes.moderated
                                || chanuser_mode.map_or(false, |chum| chum.is_voice())
                            {
                                true
                            } else {
                                if !notice {
                                    self.feed_msg(
                                        &mut conn_state.stream,
                                        ErrCannotSendToChan404 {
                                            client,
                                            channel: chan_str,
                                        },
                                    )
                                    .await?;
                                }
                                false
                            }
                        };
                        // banned unless a ban exception matches
                        let can_send = can_send && {
                            if !chanobj.modes.banned(&conn_state.user_state.source) {
                                true
                            } else {
                                if !notice {
                                    self.feed_msg(
                                        &mut conn_state.stream,
                                        ErrCannotSendToChan404 {
                                            client,
                                            channel: chan_str,
                                        },
                                    )
                                    .await?;
                                }
                                false
                            }
                        };
                        // colorless channel rejects color codes
                        let can_send = can_send && {
                            if !chanobj.modes.colorless || !text.contains(COLOR_CODE) {
                                true
                            } else {
                                if !notice {
                                    self.feed_msg(
                                        &mut conn_state.stream,
                                        ErrCannotSendToChan404 {
                                            client,
                                            channel: chan_str,
                                        },
                                    )
                                    .await?;
                                }
                                false
                            }
                        };

                        if can_send {
                            use PrivMsgTargetType::*;
                            for (nick, chum) in &chanobj.users {
                                if nick == &user_nick {
                                    continue;
                                }
                                // rank-prefixed targets go to the members
                                // with at least the requested rank
                                if !(target_type & ChannelAllSpecial).is_empty() {
                                    let wanted = (!(target_type & ChannelOper).is_empty()
                                        && chum.is_operator())
                                        || (!(target_type & ChannelHalfOper).is_empty()
                                            && chum.is_half_operator())
                                        || (!(target_type & ChannelVoice).is_empty()
                                            && chum.is_voice());
                                    if !wanted {
                                        continue;
                                    }
                                }
                                let cur_user = state.users.get(nick).unwrap();
                                if cur_user.is_silencing(&conn_state.user_state.source) {
                                    continue;
                                }
                                cur_user
                                    .send_msg_display(&conn_state.user_state.source, &msg_str)?;
                            }
                            something_done = true;
                        }
                    } else if !notice {
                        self.feed_msg(
                            &mut conn_state.stream,
                            ErrNoSuchChannel403 {
                                client,
                                channel: chan_str,
                            },
                        )
                        .await?;
                    }
                } else {
                    // to user
                    let ftarget = state.folded(target);
                    if let Some(cur_user) = state.users.get(&ftarget) {
                        // a silenced sender is dropped without any notice
                        if !cur_user.is_silencing(&conn_state.user_state.source) {
                            cur_user.send_msg_display(&conn_state.user_state.source, &msg_str)?;
                            if !notice {
                                if let Some(ref away) = cur_user.away {
                                    self.feed_msg(
                                        &mut conn_state.stream,
                                        RplAway301 {
                                            client,
                                            nick: target,
                                            message: away,
                                        },
                                    )
                                    .await?;
                                }
                            }
                        }
                        something_done = true;
                    } else if !notice {
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
            }
        }

        if something_done {
            let mut state = self.state.write().await;
            let user = state.users.get_mut(&user_nick).unwrap();
            user.last_activity = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs();
        }
        Ok(())
    }

    pub(super) async fn process_privmsg<'a>(
        &self,
        conn_state: &mut ConnState,
        targets: Vec<&'a str>,
        text: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        self.process_privmsg_notice(conn_state, targets, text, false)
            .await
    }

    pub(super) async fn process_notice<'a>(
        &self,
        conn_state: &mut ConnState,
        targets: Vec<&'a str>,
        text: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        self.process_privmsg_notice(conn_state, targets, text, true)
            .await
    }

    async fn send_who_info<'a>(
        &self,
        conn_state: &mut ConnState,
        channel: Option<(&'a str, &ChannelUserModes)>,
        user: &User,
        cmd_user: &User,
    ) -> Result<(), Box<dyn Error>> {
        if !user.modes.invisible || !user.channels.is_disjoint(&cmd_user.channels) {
            let client = conn_state.user_state.client_name();
            let mut flags = String::new();
            if user.away.is_some() {
                flags.push('G');
            } else {
                flags.push('H');
            }
            if user.modes.is_local_oper() {
                flags.push('*');
            }
            if let Some((_, chum)) = channel {
                flags += &chum.prefix();
            }
            self.feed_msg(
                &mut conn_state.stream,
                RplWhoReply352 {
                    client,
                    channel: channel.map(|(c, _)| c).unwrap_or("*"),
                    username: &user.name,
                    host: &user.hostname,
                    server: &self.config.name,
                    nick: &user.nick,
                    flags: &flags,
                    hopcount: 0,
                    realname: &user.realname,
                },
            )
            .await?;
        }
        Ok(())
    }

    pub(super) async fn process_who<'a>(
        &self,
        conn_state: &mut ConnState,
        mask: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        let state = self.state.read().await;
        let user_nick = self.folded(conn_state.user_state.nick.as_ref().unwrap());
        let user = state.users.get(&user_nick).unwrap();

        if mask.contains('*') || mask.contains('?') {
            for u in state.users.values() {
                if match_wildcard(mask, &u.nick)
                    || match_wildcard(mask, &u.source)
                    || match_wildcard(mask, &u.realname)
                {
                    self.send_who_info(conn_state, None, u, user).await?;
                }
            }
        } else if self.chantypes.is_channel_name(mask) {
            if let Some(channel) = state.channels.get(&state.folded(mask)) {
                for (u, chum) in &channel.users {
                    self.send_who_info(
                        conn_state,
                        Some((&channel.name, chum)),
                        state.users.get(u).unwrap(),
                        user,
                    )
                    .await?;
                }
            }
        } else if let Some(arg_user) = state.users.get(&state.folded(mask)) {
            self.send_who_info(conn_state, None, arg_user, user).await?;
        }
        let client = conn_state.user_state.client_name();
        self.feed_msg(&mut conn_state.stream, RplEndOfWho315 { client, mask })
            .await?;
        Ok(())
    }

    pub(super) async fn process_whois<'a>(
        &self,
        conn_state: &mut ConnState,
        target: Option<&'a str>,
        nickmasks: Vec<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();

        if target.is_some() {
            self.feed_msg(
                &mut conn_state.stream,
                ErrUnknownError400 {
                    client,
                    command: "WHOIS",
                    subcommand: None,
                    info: "Server unsupported",
                },
            )
            .await?;
            return Ok(());
        }
        let state = self.state.read().await;
        let user_nick = self.folded(conn_state.user_state.nick.as_ref().unwrap());
        let user = state.users.get(&user_nick).unwrap();

        let mut nicks = HashSet::<String>::new();
        let mut real_nickmasks = vec![];

        nickmasks.iter().for_each(|nickmask| {
            if nickmask.contains('*') || nickmask.contains('?') {
                real_nickmasks.push(nickmask);
            } else {
                let fnick = state.folded(nickmask);
                if state.users.contains_key(&fnick) {
                    nicks.insert(fnick);
                }
            }
        });

        state.users.keys().for_each(|nick| {
            if real_nickmasks.iter().any(|mask| match_wildcard(mask, nick)) {
                nicks.insert(nick.to_string());
            }
        });

        for nick in nicks {
            let arg_user = state.users.get(&nick).unwrap();
            if arg_user.modes.invisible && arg_user.channels.is_disjoint(&user.channels) {
                continue;
            }

            if arg_user.registered {
                self.feed_msg(
                    &mut conn_state.stream,
                    RplWhoIsRegNick307 {
                        client,
                        nick: &arg_user.nick,
                    },
                )
                .await?;
            }
            self.feed_msg(
                &mut conn_state.stream,
                RplWhoIsUser311 {
                    client,
                    nick: &arg_user.nick,
                    username: &arg_user.name,
                    host: &arg_user.hostname,
                    realname: &arg_user.realname,
                },
            )
            .await?;
            self.feed_msg(
                &mut conn_state.stream,
                RplWhoIsServer312 {
                    client,
                    nick: &arg_user.nick,
                    server: &self.config.name,
                    server_info: &self.config.info,
                },
            )
            .await?;
            if arg_user.modes.is_local_oper() {
                self.feed_msg(
                    &mut conn_state.stream,
                    RplWhoIsOperator313 {
                        client,
                        nick: &arg_user.nick,
                    },
                )
                .await?;
            }
            // channels
            let channel_replies = arg_user
                .channels
                .iter()
                .filter_map(|chname| {
                    let ch = state.channels.get(chname).unwrap();
                    if !ch.modes.secret {
                        Some(WhoIsChannelStruct {
                            prefix: Some(ch.users.get(&nick).unwrap().prefix()),
                            channel: &ch.name,
                        })
                    } else {
                        None
                    }
                })
                .collect::<Vec<_>>();

            for chr_chunk in channel_replies.chunks(30) {
                self.feed_msg(
                    &mut conn_state.stream,
                    RplWhoIsChannels319 {
                        client,
                        nick: &arg_user.nick,
                        channels: chr_chunk,
                    },
                )
                .await?;
            }

            self.feed_msg(
                &mut conn_state.stream,
                RplwhoIsIdle317 {
                    client,
                    nick: &arg_user.nick,
                    secs: SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .unwrap()
                        .as_secs()
                        - arg_user.last_activity,
                    signon: arg_user.signon,
                },
            )
            .await?;
            if user.modes.is_local_oper() {
                self.feed_msg(
                    &mut conn_state.stream,
                    RplWhoIsHost378 {
                        client,
                        nick: &arg_user.nick,
                        host_info: &arg_user.hostname,
                    },
                )
                .await?;
                self.feed_msg(
                    &mut conn_state.stream,
                    RplWhoIsModes379 {
                        client,
                        nick: &arg_user.nick,
                        modes: &arg_user.modes.to_string(),
                    },
                )
                .await?;
            }
        }
        self.feed_msg(
            &mut conn_state.stream,
            RplEndOfWhoIs318 {
                client,
                nick: &nickmasks.join(","),
            },
        )
        .await?;
        Ok(())
    }

    pub(super) async fn process_whowas<'a>(
        &self,
        conn_state: &mut ConnState,
        nickname: &'a str,
        count: Option<usize>,
        server: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();

        if server.is_some() {
            self.feed_msg(
                &mut conn_state.stream,
                ErrUnknownError400 {
                    client,
                    command: "WHOWAS",
                    subcommand: None,
                    info: "Server unsupported",
                },
            )
            .await?;
            return Ok(());
        }
        let state = self.state.read().await;
        let fnick = state.folded(nickname);
        // newest first out of the bounded ring
        let entries: Vec<&NickHistoryEntry> = state
            .nick_history
            .iter()
            .rev()
            .filter(|e| state.folded(&e.nick) == fnick)
            .take(count.unwrap_or(usize::MAX))
            .collect();

        if entries.is_empty() {
            self.feed_msg(
                &mut conn_state.stream,
                ErrWasNoSuchNick406 {
                    client,
                    nick: nickname,
                },
            )
            .await?;
        } else {
            for entry in entries {
                self.feed_msg(
                    &mut conn_state.stream,
                    RplWhoWasUser314 {
                        client,
                        nick: &entry.nick,
                        username: &entry.username,
                        host: &entry.hostname,
                        realname: &entry.realname,
                    },
                )
                .await?;
            }
        }
        self.feed_msg(
            &mut conn_state.stream,
            RplEndOfWhoWas369 {
                client,
                nick: nickname,
            },
        )
        .await?;
        Ok(())
    }

    pub(super) async fn process_kill<'a>(
        &self,
        conn_state: &mut ConnState,
        nickname: &'a str,
        comment: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        let mut state = self.state.write().await;
        let user_nick = conn_state.user_state.nick.as_ref().unwrap().clone();
        let target_nick = state.folded(nickname);

        if let Some(user_to_kill) = state.users.get_mut(&target_nick) {
            info!("User {} killed by {}: {}", nickname, user_nick, comment);
            if let Some(sender) = user_to_kill.quit_sender.take() {
                sender
                    .send((user_nick, comment.to_string()))
                    .map_err(|_| "quit sender error".to_string())?;
            }
        } else {
            self.feed_msg(
                &mut conn_state.stream,
                ErrNoSuchNick401 {
                    client,
                    nick: nickname,
                },
            )
            .await?;
        }
        Ok(())
    }

    // stop the server. the goodbye and the quit of every user task is
    // driven through the per-user quit channels.
    async fn shutdown_server(&self, reason: &str) -> Result<(), Box<dyn Error>> {
        let mut state = self.state.write().await;
        for u in state.users.values_mut() {
            if let Some(sender) = u.quit_sender.take() {
                let _ = sender.send((String::new(), reason.to_string()));
            }
        }
        if let Some(sender) = state.quit_sender.take() {
            sender.send(reason.to_string())?;
        }
        Ok(())
    }

    pub(super) async fn process_die(
        &self,
        conn_state: &mut ConnState,
    ) -> Result<(), Box<dyn Error>> {
        info!("DIE from {}", conn_state.user_state.source);
        conn_state.quit.store(1, std::sync::atomic::Ordering::SeqCst);
        conn_state.quit_reason = Some("Server Shutdown".to_string());
        self.shutdown_server("Server Shutdown").await
    }

    pub(super) async fn process_restart(
        &self,
        conn_state: &mut ConnState,
    ) -> Result<(), Box<dyn Error>> {
        info!("RESTART from {}", conn_state.user_state.source);
        self.restart.store(true, std::sync::atomic::Ordering::SeqCst);
        conn_state.quit.store(1, std::sync::atomic::Ordering::SeqCst);
        conn_state.quit_reason = Some("Server Restart".to_string());
        self.shutdown_server("Server Restart").await
    }

    pub(super) async fn process_rehash(
        &self,
        conn_state: &mut ConnState,
    ) -> Result<(), Box<dyn Error>> {
        // the configuration is immutable for the life of one server run.
        // acknowledge and leave the reload to the process entry.
        info!("REHASH from {}", conn_state.user_state.source);
        let client = conn_state.user_state.client_name();
        self.feed_msg(
            &mut conn_state.stream,
            RplRehashing382 {
                client,
                config_file: "trircd.toml",
            },
        )
        .await?;
        Ok(())
    }

    pub(super) async fn process_squit<'a>(
        &self,
        conn_state: &mut ConnState,
        server: &'a str,
        comment: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        if self.config.name != server {
            // no other servers are linked
            self.feed_msg(&mut conn_state.stream, ErrNoSuchServer402 { client, server })
                .await?;
        } else {
            info!("SQUIT from {}: {}", conn_state.user_state.source, comment);
            conn_state.quit.store(1, std::sync::atomic::Ordering::SeqCst);
            conn_state.quit_reason = Some(comment.to_string());
            self.shutdown_server(comment).await?;
        }
        Ok(())
    }

    pub(super) async fn process_away<'a>(
        &self,
        conn_state: &mut ConnState,
        text: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        let mut state = self.state.write().await;
        let user_nick = self.folded(conn_state.user_state.nick.as_ref().unwrap());
        let user = state.users.get_mut(&user_nick).unwrap();
        if let Some(t) = text {
            user.away = Some(t.to_string());
            self.feed_msg(&mut conn_state.stream, RplNowAway306 { client })
                .await?;
        } else {
            user.away = None;
            self.feed_msg(&mut conn_state.stream, RplUnAway305 { client })
                .await?;
        }
        Ok(())
    }

    pub(super) async fn process_ison<'a>(
        &self,
        conn_state: &mut ConnState,
        nicknames: Vec<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        let state = self.state.read().await;
        let online: Vec<&str> = nicknames
            .iter()
            .filter(|n| state.users.contains_key(&state.folded(n)))
            .copied()
            .collect();
        self.feed_msg(
            &mut conn_state.stream,
            RplIson303 {
                client,
                nicknames: &online,
            },
        )
        .await?;
        Ok(())
    }

    pub(super) async fn process_userhost<'a>(
        &self,
        conn_state: &mut ConnState,
        nicknames: Vec<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        let state = self.state.read().await;

        for nicks in nicknames.chunks(20) {
            let replies = nicks
                .iter()
                .filter_map(|nick| {
                    state.users.get(&state.folded(nick)).map(|user| {
                        let away_sign = if user.away.is_some() { '-' } else { '+' };
                        format!("{}={}~{}@{}", user.nick, away_sign, user.name, user.hostname)
                    })
                })
                .collect::<Vec<_>>();
            self.feed_msg(
                &mut conn_state.stream,
                RplUserHost302 {
                    client,
                    replies: &replies,
                },
            )
            .await?;
        }
        Ok(())
    }

    pub(super) async fn process_wallops<'a>(
        &self,
        conn_state: &mut ConnState,
        _: &'a str,
        msg: &'a Message<'a>,
    ) -> Result<(), Box<dyn Error>> {
        let state = self.state.read().await;
        state.wallops_users.iter().try_for_each(|wu| {
            state
                .users
                .get(wu)
                .unwrap()
                .send_message(msg, &conn_state.user_state.source)
        })?;
        Ok(())
    }

    pub(super) async fn process_summon<'a>(
        &self,
        conn_state: &mut ConnState,
        _: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        self.feed_msg(&mut conn_state.stream, ErrSummonDisabled445 { client })
            .await?;
        Ok(())
    }

    pub(super) async fn process_silence<'a>(
        &self,
        conn_state: &mut ConnState,
        mask: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        let mut state = self.state.write().await;
        let user_nick = self.folded(conn_state.user_state.nick.as_ref().unwrap());

        if let Some(mask) = mask {
            let (remove, raw_mask) = match mask.chars().next() {
                Some('-') => (true, &mask[1..]),
                Some('+') => (false, &mask[1..]),
                _ => (false, mask),
            };
            if raw_mask.is_empty() {
                return Ok(());
            }
            let norm_mask = normalize_sourcemask(raw_mask);
            let user = state.users.get_mut(&user_nick).unwrap();
            if remove {
                user.silence.retain(|m| m != &norm_mask);
            } else if !user.silence.contains(&norm_mask) {
                if user.silence.len() >= SILENCE_LIST_SIZE {
                    self.feed_msg(
                        &mut conn_state.stream,
                        ErrSilListFull511 {
                            client,
                            mask: &norm_mask,
                        },
                    )
                    .await?;
                } else {
                    user.silence.push(norm_mask);
                }
            }
        } else {
            // enumerate the silence list
            let user = state.users.get(&user_nick).unwrap();
            for mask in &user.silence {
                self.feed_msg(&mut conn_state.stream, RplSilList271 { client, mask })
                    .await?;
            }
            self.feed_msg(&mut conn_state.stream, RplEndOfSilList272 { client })
                .await?;
        }
        Ok(())
    }

    pub(super) async fn process_language<'a>(
        &self,
        conn_state: &mut ConnState,
        _: Vec<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        self.feed_msg(
            &mut conn_state.stream,
            ErrUnknownError400 {
                client,
                command: "LANGUAGE",
                subcommand: None,
                info: "Language negotiation is not supported",
            },
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::super::test::*;
    use super::*;
    use std::time::Duration;
    use tokio::time;

    #[tokio::test]
    async fn test_command_privmsg_user() {
        let (main_state, handle, port) = run_test_server(MainConfig::default()).await;
        {
            let mut alice_stream = login_to_test_and_skip(port, "alice", "alice", "Alice").await;
            let mut bob_stream = login_to_test_and_skip(port, "bob", "bob", "Bob").await;

            alice_stream
                .send("PRIVMSG bob :Hello bob!".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":alice!~alice@127.0.0.1 PRIVMSG bob :Hello bob!".to_string(),
                bob_stream.next().await.unwrap().unwrap()
            );
            // case-folded delivery
            alice_stream
                .send("PRIVMSG BOB :Hello again!".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":alice!~alice@127.0.0.1 PRIVMSG BOB :Hello again!".to_string(),
                bob_stream.next().await.unwrap().unwrap()
            );
            alice_stream
                .send("PRIVMSG nobody :Hello?".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":irc.irc 401 alice nobody :No such nick/channel".to_string(),
                alice_stream.next().await.unwrap().unwrap()
            );
            alice_stream.send("QUIT :Bye".to_string()).await.unwrap();
            bob_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_privmsg_moderation() {
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

            alice_stream
                .send("MODE #room +m".to_string())
                .await
                .unwrap();
            alice_stream.next().await.unwrap().unwrap();
            bob_stream.next().await.unwrap().unwrap();

            // bob has no voice on the moderated channel
            bob_stream
                .send("PRIVMSG #room :hi".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":irc.irc 404 bob #room :Cannot send to channel".to_string(),
                bob_stream.next().await.unwrap().unwrap()
            );

            alice_stream
                .send("MODE #room +v bob".to_string())
                .await
                .unwrap();
            alice_stream.next().await.unwrap().unwrap();
            bob_stream.next().await.unwrap().unwrap();

            bob_stream
                .send("PRIVMSG #room :hi".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":bob!~bob@127.0.0.1 PRIVMSG #room :hi".to_string(),
                alice_stream.next().await.unwrap().unwrap()
            );
            alice_stream.send("QUIT :Bye".to_string()).await.unwrap();
            bob_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_privmsg_no_external() {
        let mut config = MainConfig::default();
        config.channels = Some(vec![ChannelConfig {
            name: "#internal".to_string(),
            topic: None,
            modes: ChannelModes {
                no_external_messages: true,
                ..ChannelModes::default()
            },
        }]);
        let (main_state, handle, port) = run_test_server(config).await;
        {
            let mut out_stream = login_to_test_and_skip(port, "out", "out", "Outsider").await;
            out_stream
                .send("PRIVMSG #internal :knock knock".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":irc.irc 404 out #internal :Cannot send to channel".to_string(),
                out_stream.next().await.unwrap().unwrap()
            );
            // NOTICE must never trigger an automatic reply
            out_stream
                .send("NOTICE #internal :knock knock".to_string())
                .await
                .unwrap();
            out_stream.send("PING :probe".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc PONG irc.irc :probe".to_string(),
                out_stream.next().await.unwrap().unwrap()
            );
            out_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_privmsg_away() {
        let (main_state, handle, port) = run_test_server(MainConfig::default()).await;
        {
            let mut alice_stream = login_to_test_and_skip(port, "alice", "alice", "Alice").await;
            let mut bob_stream = login_to_test_and_skip(port, "bob", "bob", "Bob").await;
            bob_stream
                .send("AWAY :Out for lunch".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":irc.irc 306 bob :You have been marked as being away".to_string(),
                bob_stream.next().await.unwrap().unwrap()
            );
            alice_stream
                .send("PRIVMSG bob :you there?".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":irc.irc 301 alice bob :Out for lunch".to_string(),
                alice_stream.next().await.unwrap().unwrap()
            );
            bob_stream.next().await.unwrap().unwrap(); // delivered anyway

            bob_stream.send("AWAY".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc 305 bob :You are no longer marked as being away".to_string(),
                bob_stream.next().await.unwrap().unwrap()
            );
            alice_stream.send("QUIT :Bye".to_string()).await.unwrap();
            bob_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_silence() {
        let (main_state, handle, port) = run_test_server(MainConfig::default()).await;
        {
            let mut alice_stream = login_to_test_and_skip(port, "alice", "alice", "Alice").await;
            let mut bob_stream = login_to_test_and_skip(port, "bob", "bob", "Bob").await;

            alice_stream
                .send("SILENCE +bob!*@*".to_string())
                .await
                .unwrap();
            alice_stream.send("SILENCE".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc 271 alice bob!*@*".to_string(),
                alice_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 272 alice :End of Silence List".to_string(),
                alice_stream.next().await.unwrap().unwrap()
            );

            // bob's message is silently dropped - no error for bob either
            bob_stream
                .send("PRIVMSG alice :hey alice".to_string())
                .await
                .unwrap();
            bob_stream.send("PING :check".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc PONG irc.irc :check".to_string(),
                bob_stream.next().await.unwrap().unwrap()
            );
            // alice received nothing - her next line is a PONG answer
            alice_stream.send("PING :empty".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc PONG irc.irc :empty".to_string(),
                alice_stream.next().await.unwrap().unwrap()
            );

            alice_stream
                .send("SILENCE -bob!*@*".to_string())
                .await
                .unwrap();
            bob_stream
                .send("PRIVMSG alice :hey again".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":bob!~bob@127.0.0.1 PRIVMSG alice :hey again".to_string(),
                alice_stream.next().await.unwrap().unwrap()
            );
            alice_stream.send("QUIT :Bye".to_string()).await.unwrap();
            bob_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_who_whois() {
        let (main_state, handle, port) = run_test_server(MainConfig::default()).await;
        {
            let mut alice_stream = login_to_test_and_skip(port, "alice", "alice", "Alice").await;
            let mut bob_stream = login_to_test_and_skip(port, "bob", "bob", "Bob").await;
            alice_stream.send("JOIN #room".to_string()).await.unwrap();
            for _ in 0..4 {
                alice_stream.next().await.unwrap().unwrap();
            }

            bob_stream.send("WHO #room".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc 352 bob #room ~alice 127.0.0.1 irc.irc alice H@ :0 Alice"
                    .to_string(),
                bob_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 315 bob #room :End of WHO list".to_string(),
                bob_stream.next().await.unwrap().unwrap()
            );

            bob_stream.send("WHOIS alice".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc 311 bob alice ~alice 127.0.0.1 * :Alice".to_string(),
                bob_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 312 bob alice irc.irc :This is IRC server".to_string(),
                bob_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 319 bob alice :@#room".to_string(),
                bob_stream.next().await.unwrap().unwrap()
            );
            assert!(bob_stream
                .next()
                .await
                .unwrap()
                .unwrap()
                .starts_with(":irc.irc 317 bob alice "));
            assert_eq!(
                ":irc.irc 318 bob alice :End of /WHOIS list".to_string(),
                bob_stream.next().await.unwrap().unwrap()
            );
            alice_stream.send("QUIT :Bye".to_string()).await.unwrap();
            bob_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_whowas() {
        let mut config = MainConfig::default();
        config.nick_history_size = 10;
        let (main_state, handle, port) = run_test_server(config).await;
        {
            let mut seeker_stream =
                login_to_test_and_skip(port, "seeker", "seek", "Seeker").await;
            {
                let mut gone_stream =
                    login_to_test_and_skip(port, "goner", "gone", "Gone Forever").await;
                gone_stream.send("QUIT :Bye".to_string()).await.unwrap();
                gone_stream.next().await.unwrap().unwrap();
            }
            // wait until the server swept the leaving user
            time::sleep(Duration::from_millis(100)).await;

            seeker_stream.send("WHOWAS goner".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc 314 seeker goner ~gone 127.0.0.1 * :Gone Forever".to_string(),
                seeker_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 369 seeker goner :End of WHOWAS".to_string(),
                seeker_stream.next().await.unwrap().unwrap()
            );

            seeker_stream
                .send("WHOWAS neverwas".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":irc.irc 406 seeker neverwas :There was no such nickname".to_string(),
                seeker_stream.next().await.unwrap().unwrap()
            );
            assert_eq!(
                ":irc.irc 369 seeker neverwas :End of WHOWAS".to_string(),
                seeker_stream.next().await.unwrap().unwrap()
            );
            seeker_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_ison_userhost() {
        let (main_state, handle, port) = run_test_server(MainConfig::default()).await;
        {
            let mut alice_stream = login_to_test_and_skip(port, "alice", "alice", "Alice").await;
            let mut bob_stream = login_to_test_and_skip(port, "bob", "bob", "Bob").await;
            alice_stream
                .send("ISON bob nobody alice".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":irc.irc 303 alice :bob alice".to_string(),
                alice_stream.next().await.unwrap().unwrap()
            );
            alice_stream
                .send("USERHOST bob nobody".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":irc.irc 302 alice :bob=+~bob@127.0.0.1".to_string(),
                alice_stream.next().await.unwrap().unwrap()
            );
            alice_stream.send("QUIT :Bye".to_string()).await.unwrap();
            bob_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_wallops() {
        let mut config = MainConfig::default();
        config.operators = Some(vec![OperatorConfig {
            name: "guru".to_string(),
            password: argon2_hash_password("mythebestday"),
            mask: None,
        }]);
        let (main_state, handle, port) = run_test_server(config).await;
        {
            let mut oper_stream = login_to_test_and_skip(port, "boss", "boss", "Boss").await;
            oper_stream
                .send("OPER guru mythebestday".to_string())
                .await
                .unwrap();
            oper_stream.next().await.unwrap().unwrap();

            let mut listener_stream =
                login_to_test_and_skip(port, "listener", "listen", "Listener").await;
            listener_stream
                .send("MODE listener +w".to_string())
                .await
                .unwrap();
            listener_stream.next().await.unwrap().unwrap();

            oper_stream
                .send("WALLOPS :Server maintenance soon".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":boss!~boss@127.0.0.1 WALLOPS :Server maintenance soon".to_string(),
                listener_stream.next().await.unwrap().unwrap()
            );
            oper_stream.send("QUIT :Bye".to_string()).await.unwrap();
            listener_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_kill() {
        let mut config = MainConfig::default();
        config.operators = Some(vec![OperatorConfig {
            name: "guru".to_string(),
            password: argon2_hash_password("mythebestday"),
            mask: None,
        }]);
        let (main_state, handle, port) = run_test_server(config).await;
        {
            let mut oper_stream = login_to_test_and_skip(port, "boss", "boss", "Boss").await;
            oper_stream
                .send("OPER guru mythebestday".to_string())
                .await
                .unwrap();
            oper_stream.next().await.unwrap().unwrap();

            let mut victim_stream =
                login_to_test_and_skip(port, "victim", "victim", "Victim").await;
            oper_stream
                .send("KILL victim :Abuse".to_string())
                .await
                .unwrap();
            assert_eq!(
                ":irc.irc ERROR :User killed by boss: Abuse".to_string(),
                victim_stream.next().await.unwrap().unwrap()
            );
            // wait until the server swept the killed user
            time::sleep(Duration::from_millis(100)).await;
            {
                let state = main_state.state.read().await;
                assert!(!state.users.contains_key("victim"));
            }
            oper_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_summon_language() {
        let (main_state, handle, port) = run_test_server(MainConfig::default()).await;
        {
            let mut line_stream = login_to_test_and_skip(port, "caller", "call", "Caller").await;
            line_stream.send("SUMMON jonny".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc 445 caller :SUMMON has been disabled".to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            line_stream.send("LANGUAGE pl".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc 400 caller LANGUAGE :Language negotiation is not supported"
                    .to_string(),
                line_stream.next().await.unwrap().unwrap()
            );
            line_stream.send("QUIT :Bye".to_string()).await.unwrap();
        }
        quit_test_server(main_state, handle).await;
    }

    #[tokio::test]
    async fn test_command_die() {
        let mut config = MainConfig::default();
        config.operators = Some(vec![OperatorConfig {
            name: "guru".to_string(),
            password: argon2_hash_password("mythebestday"),
            mask: None,
        }]);
        let (_, handle, port) = run_test_server(config).await;
        {
            let mut oper_stream = login_to_test_and_skip(port, "boss", "boss", "Boss").await;
            let mut other_stream = login_to_test_and_skip(port, "other", "other", "Other").await;
            oper_stream
                .send("OPER guru mythebestday".to_string())
                .await
                .unwrap();
            oper_stream.next().await.unwrap().unwrap();

            oper_stream.send("DIE".to_string()).await.unwrap();
            assert_eq!(
                ":irc.irc ERROR :Server Shutdown".to_string(),
                other_stream.next().await.unwrap().unwrap()
            );
            // the accept loop finishes
            handle.await.unwrap();
        }
    }
}
