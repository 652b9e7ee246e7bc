// channel_cmds.rs - channel commands
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
use std::ops::DerefMut;
use std::time::{SystemTime, UNIX_EPOCH};

impl super::MainState {
    pub(super) async fn process_join<'a>(
        &self,
        conn_state: &mut ConnState,
        channels: Vec<&'a str>,
        keys_opt: Option<Vec<&'a str>>,
    ) -> Result<(), Box<dyn Error>> {
        let mut statem = self.state.write().await;
        let state = statem.deref_mut();
        let user_nick = self.folded(conn_state.user_state.nick.as_ref().unwrap());
        let user_joined = state.users.get(&user_nick).unwrap().channels.len();
        let mut join_count = user_joined;

        let mut joined_created = vec![];

        {
            let client = conn_state.user_state.client_name();
            for (i, chname_str) in channels.iter().enumerate() {
                // channel-type registry decides what a channel name is
                if !self.chantypes.is_channel_name(chname_str)
                    || chname_str.len() > self.config.max_channel_name
                {
                    self.feed_msg(
                        &mut conn_state.stream,
                        ErrNoSuchChannel403 {
                            client,
                            channel: chname_str,
                        },
                    )
                    .await?;
                    joined_created.push((false, false));
                    continue;
                }
                let chtype = self
                    .chantypes
                    .by_prefix(chname_str.chars().next().unwrap())
                    .unwrap();
                let chname = state.folded(chname_str);
                let user = state.users.get(&user_nick).unwrap();
                let (join, create) = if let Some(channel) = state.channels.get(&chname) {
                    // already a member - silently nothing to do
                    if channel.users.contains_key(&user_nick) {
                        joined_created.push((false, false));
                        continue;
                    }

                    // key check comes first
                    let do_join = if let Some(key) = &channel.modes.key {
                        let good = keys_opt
                            .as_ref()
                            .map_or(false, |keys| {
                                keys.get(i).map_or(false, |k| *k == key.as_str())
                            });
                        if !good {
                            self.feed_msg(
                                &mut conn_state.stream,
                                ErrBadChannelKey475 {
                                    client,
                                    channel: chname_str,
                                },
                            )
                            .await?;
                        }
                        good
                    } else {
                        true
                    };

                    // check whether channel is not full
                    let do_join = do_join && {
                        let not_full = if let Some(client_limit) = channel.modes.client_limit {
                            channel.users.len() < client_limit
                        } else {
                            true
                        };
                        if !not_full {
                            self.feed_msg(
                                &mut conn_state.stream,
                                ErrChannelIsFull471 {
                                    client,
                                    channel: chname_str,
                                },
                            )
                            .await?;
                        }
                        not_full
                    };

                    // check whether user has an invitation
                    let do_join = do_join && {
                        if !chtype.supports_invites
                            || !channel.modes.invite_only
                            || user.invited_to.contains(&chname)
                            || channel.modes.invite_exception.as_ref().map_or(false, |e| {
                                e.iter()
                                    .any(|e| match_wildcard(e, &conn_state.user_state.source))
                            })
                        {
                            true
                        } else {
                            self.feed_msg(
                                &mut conn_state.stream,
                                ErrInviteOnlyChan473 {
                                    client,
                                    channel: chname_str,
                                },
                            )
                            .await?;
                            false
                        }
                    };

                    // check whether user is banned
                    let do_join = do_join && {
                        if !chtype.supports_bans
                            || !channel.modes.banned(&conn_state.user_state.source)
                        {
                            true
                        } else {
                            self.feed_msg(
                                &mut conn_state.stream,
                                ErrBannedFromChan474 {
                                    client,
                                    channel: chname_str,
                                },
                            )
                            .await?;
                            false
                        }
                    };

                    (do_join, false)
                } else {
                    // if new channel
                    (true, true)
                };

                // check whether user is not in max channels
                let do_join = if let Some(max_joins) = self.config.max_joins {
                    if join && join_count >= max_joins {
                        self.feed_msg(
                            &mut conn_state.stream,
                            ErrTooManyChannels405 {
                                client,
                                channel: chname_str,
                            },
                        )
                        .await?;
                    }
                    join && join_count < max_joins
                } else {
                    join
                };

                joined_created.push((do_join, create));
                if do_join {
                    join_count += 1;
                }
            }

            // insert create channel or add user to channel
            for ((join, create), chname_str) in joined_created.iter().zip(channels.iter()) {
                if *join {
                    let chname = state.folded(chname_str);
                    let user = state.users.get_mut(&user_nick).unwrap();
                    user.channels.insert(chname.clone());
                    user.invited_to.remove(&chname);
                    if *create {
                        info!(
                            "User {} create channel {}",
                            conn_state.user_state.source, chname_str
                        );
                        state.channels.insert(
                            chname,
                            Channel::new_on_user_join(chname_str.to_string(), user_nick.clone()),
                        );
                    } else {
                        state
                            .channels
                            .get_mut(&chname)
                            .unwrap()
                            .add_user(&user_nick);
                    }
                }
            }
            // if something done - then change last activity
            if join_count != user_joined {
                let user = state.users.get_mut(&user_nick).unwrap();
                user.last_activity = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap()
                    .as_secs();
            }
        }

        // sending messages
        {
            for ((join, _), chname_str) in joined_created.iter().zip(channels.iter()) {
                if *join {
                    let chname = state.folded(chname_str);
                    let chanobj = state.channels.get(&chname).unwrap();
                    let join_msg = "JOIN ".to_string() + chname_str;
                    {
                        let client = conn_state.user_state.client_name();
                        self.feed_msg_source(
                            &mut conn_state.stream,
                            &conn_state.user_state.source,
                            join_msg.as_str(),
                        )
                        .await?;
                        if let Some(ref topic) = chanobj.topic {
                            self.feed_msg(
                                &mut conn_state.stream,
                                RplTopic332 {
                                    client,
                                    channel: chname_str,
                                    topic: &topic.topic,
                                },
                            )
                            .await?;
                            self.feed_msg(
                                &mut conn_state.stream,
                                RplTopicWhoTime333 {
                                    client,
                                    channel: chname_str,
                                    nick: &topic.nick,
                                    setat: topic.set_time,
                                },
                            )
                            .await?;
                        } else {
                            self.feed_msg(
                                &mut conn_state.stream,
                                RplNoTopic331 {
                                    client,
                                    channel: chname_str,
                                },
                            )
                            .await?;
                        }
                    }
                    self.send_names_from_channel(conn_state, chanobj, &state.users, true)
                        .await?;

                    // send message to other users in channel
                    for nick in chanobj.users.keys() {
                        if nick != &user_nick {
                            state
                                .users
                                .get(nick)
                                .unwrap()
                                .send_msg_display(&conn_state.user_state.source, join_msg.as_str())?;
                        }
                    }
                }
            }
        }

        Ok(())
    }

    pub(super) async fn process_part<'a>(
        &self,
        conn_state: &mut ConnState,
        channels: Vec<&'a str>,
        reason: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        let mut statem = self.state.write().await;
        let state = statem.deref_mut();
        let user_nick = self.folded(conn_state.user_state.nick.as_ref().unwrap());

        let mut something_done = false;

        for channel in &channels {
            let chname = state.folded(channel);
            if let Some(chanobj) = state.channels.get(&chname) {
                // if user in channel
                let do_it = if chanobj.users.contains_key(&user_nick) {
                    something_done = true;
                    true
                } else {
                    self.feed_msg(&mut conn_state.stream, ErrNotOnChannel442 { client, channel })
                        .await?;
                    false
                };

                // send message
                if do_it {
                    let part_msg = if let Some(r) = reason {
                        format!("PART {} :{}", channel, r)
                    } else {
                        format!("PART {}", channel)
                    };
                    for nick in chanobj.users.keys() {
                        state
                            .users
                            .get(nick)
                            .unwrap()
                            .send_msg_display(&conn_state.user_state.source, part_msg.as_str())?;
                    }
                    state.remove_user_from_channel(&chname, &user_nick);
                }
            } else {
                self.feed_msg(&mut conn_state.stream, ErrNoSuchChannel403 { client, channel })
                    .await?;
            }
        }

        // if something done then change last activity time
        if something_done {
            let user = state.users.get_mut(&user_nick).unwrap();
            user.last_activity = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs();
        }
        Ok(())
    }

    pub(super) async fn process_topic<'a>(
        &self,
        conn_state: &mut ConnState,
        channel: &'a str,
        topic_opt: Option<&'a str>,
        msg: &'a Message<'a>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        let chname = self.folded(channel);

        if let Some(topic) = topic_opt {
            // if change topic
            let mut state = self.state.write().await;
            let user_nick = self.folded(conn_state.user_state.nick.as_ref().unwrap());

            let do_change_topic = if let Some(chanobj) = state.channels.get(&chname) {
                if let Some(chum) = chanobj.users.get(&user_nick) {
                    // under the Modern dialect half-operator may change a
                    // protected topic, otherwise full operator is required.
                    let rank_ok = if self.config.dialect == Dialect::Modern {
                        chum.is_half_operator()
                    } else {
                        chum.is_operator()
                    };
                    if !chanobj.modes.protected_topic || rank_ok {
                        true
                    } else {
                        self.feed_msg(
                            &mut conn_state.stream,
                            ErrChanOpPrivsNeeded482 { client, channel },
                        )
                        .await?;
                        false
                    }
                } else {
                    self.feed_msg(&mut conn_state.stream, ErrNotOnChannel442 { client, channel })
                        .await?;
                    false
                }
            } else {
                self.feed_msg(&mut conn_state.stream, ErrNoSuchChannel403 { client, channel })
                    .await?;
                false
            };

            if do_change_topic {
                let nick = conn_state.user_state.nick.as_ref().unwrap().clone();
                let chanobj = state.channels.get_mut(&chname).unwrap();
                if !topic.is_empty() {
                    chanobj.topic = Some(ChannelTopic::new_with_nick(topic.to_string(), nick));
                } else {
                    chanobj.topic = None
                }
                // send message about change to all users in channel.
                let chanobj = state.channels.get(&chname).unwrap();
                for cu in chanobj.users.keys() {
                    state
                        .users
                        .get(cu)
                        .unwrap()
                        .send_message(msg, &conn_state.user_state.source)?;
                }
            }
        } else {
            // read topic
            let state = self.state.read().await;
            if let Some(chanobj) = state.channels.get(&chname) {
                let user_nick = self.folded(conn_state.user_state.nick.as_ref().unwrap());

                if chanobj.users.contains_key(&user_nick) {
                    if let Some(ref topic) = chanobj.topic {
                        self.feed_msg(
                            &mut conn_state.stream,
                            RplTopic332 {
                                client,
                                channel,
                                topic: &topic.topic,
                            },
                        )
                        .await?;
                        self.feed_msg(
                            &mut conn_state.stream,
                            RplTopicWhoTime333 {
                                client,
                                channel,
                                nick: &topic.nick,
                                setat: topic.set_time,
                            },
                        )
                        .await?;
                    } else {
                        self.feed_msg(&mut conn_state.stream, RplNoTopic331 { client, channel })
                            .await?;
                    }
                } else {
                    self.feed_msg(&mut conn_state.stream, ErrNotOnChannel442 { client, channel })
                        .await?;
                }
            } else {
                self.feed_msg(&mut conn_state.stream, ErrNoSuchChannel403 { client, channel })
                    .await?;
            }
        }
        Ok(())
    }

    // routine used for sending names of channel. end argument - if true
    // then send EndOfNames.
    async fn send_names_from_channel(
        &self,
        conn_state: &mut ConnState,
        chanobj: &Channel,
        users: &HashMap<String, User>,
        end: bool,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name().to_string();
        let user_nick = self.folded(conn_state.user_state.nick.as_ref().unwrap());
        let in_channel = chanobj.users.contains_key(&user_nick);

        let symbol = if chanobj.modes.secret {
            "@"
        } else if chanobj.modes.private {
            "*"
        } else {
            "="
        };

        let mut name_replies = vec![];
        for (nick, chum) in &chanobj.users {
            let user = users.get(nick).unwrap();
            // invisible users are only shown to channel co-members
            if user.modes.invisible && !in_channel {
                continue;
            }
            name_replies.push(NameReplyStruct {
                prefix: chum.prefix(),
                nick: &user.nick,
            });
        }
        for reply_chunk in name_replies.chunks(30) {
            self.feed_msg(
                &mut conn_state.stream,
                RplNameReply353 {
                    client: &client,
                    symbol,
                    channel: &chanobj.name,
                    replies: reply_chunk,
                },
            )
            .await?;
        }
        if end {
            self.feed_msg(
                &mut conn_state.stream,
                RplEndOfNames366 {
                    client: &client,
                    channel: &chanobj.name,
                },
            )
            .await?;
        }
        Ok(())
    }

    pub(super) async fn process_names<'a>(
        &self,
        conn_state: &mut ConnState,
        channels: Vec<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let state = self.state.read().await;
        let user_nick = self.folded(conn_state.user_state.nick.as_ref().unwrap());

        if !channels.is_empty() {
            for channel in &channels {
                let chname = state.folded(channel);
                if let Some(chanobj) = state.channels.get(&chname) {
                    let visible = !(chanobj.modes.secret || chanobj.modes.private)
                        || chanobj.users.contains_key(&user_nick);
                    if visible {
                        self.send_names_from_channel(conn_state, chanobj, &state.users, true)
                            .await?;
                        continue;
                    }
                }
                let client = conn_state.user_state.client_name();
                self.feed_msg(&mut conn_state.stream, RplEndOfNames366 { client, channel })
                    .await?;
            }
        } else {
            // all visible channels
            for chanobj in state.channels.values() {
                let visible = !(chanobj.modes.secret || chanobj.modes.private)
                    || chanobj.users.contains_key(&user_nick);
                if visible {
                    self.send_names_from_channel(conn_state, chanobj, &state.users, false)
                        .await?;
                }
            }
            let client = conn_state.user_state.client_name();
            self.feed_msg(
                &mut conn_state.stream,
                RplEndOfNames366 {
                    client,
                    channel: "*",
                },
            )
            .await?;
        }
        Ok(())
    }

    pub(super) async fn process_list<'a>(
        &self,
        conn_state: &mut ConnState,
        channels: Vec<&'a str>,
        server: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        if server.is_some() {
            self.feed_msg(
                &mut conn_state.stream,
                ErrUnknownError400 {
                    client,
                    command: "LIST",
                    subcommand: None,
                    info: "Server unsupported",
                },
            )
            .await?;
            return Ok(());
        }
        let state = self.state.read().await;
        let user_nick = self.folded(conn_state.user_state.nick.as_ref().unwrap());

        self.feed_msg(&mut conn_state.stream, RplListStart321 { client })
            .await?;
        let list_channel = |chanobj: &Channel| -> Option<(String, usize, String)> {
            let member = chanobj.users.contains_key(&user_nick);
            if chanobj.modes.secret && !member {
                return None;
            }
            // the topic of a private channel stays hidden from outsiders
            let topic = if chanobj.modes.private && !member {
                String::new()
            } else {
                chanobj
                    .topic
                    .as_ref()
                    .map(|t| t.topic.clone())
                    .unwrap_or_default()
            };
            Some((chanobj.name.clone(), chanobj.users.len(), topic))
        };

        let mut entries = vec![];
        if channels.is_empty() {
            for chanobj in state.channels.values() {
                if let Some(entry) = list_channel(chanobj) {
                    entries.push(entry);
                }
            }
        } else {
            for channel in &channels {
                if let Some(chanobj) = state.channels.get(&state.folded(channel)) {
                    if let Some(entry) = list_channel(chanobj) {
                        entries.push(entry);
                    }
                }
            }
        }
        for (channel, client_count, topic) in &entries {
            self.feed_msg(
                &mut conn_state.stream,
                RplList322 {
                    client,
                    channel,
                    client_count: *client_count,
                    topic,
                },
            )
            .await?;
        }
        self.feed_msg(&mut conn_state.stream, RplListEnd323 { client })
            .await?;
        Ok(())
    }

    pub(super) async fn process_invite<'a>(
        &self,
        conn_state: &mut ConnState,
        nickname: &'a str,
        channel: &'a str,
        msg: &'a Message<'a>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        let mut statem = self.state.write().await;
        let state = statem.deref_mut();
        let user_nick = self.folded(conn_state.user_state.nick.as_ref().unwrap());
        let chname = state.folded(channel);
        let target_nick = state.folded(nickname);

        let do_invite = if let Some(chanobj) = state.channels.get(&chname) {
            if let Some(chum) = chanobj.users.get(&user_nick) {
                if chanobj.modes.invite_only && !chum.is_operator() {
                    self.feed_msg(
                        &mut conn_state.stream,
                        ErrChanOpPrivsNeeded482 { client, channel },
                    )
                    .await?;
                    false
                } else if !state.users.contains_key(&target_nick) {
                    self.feed_msg(
                        &mut conn_state.stream,
                        ErrNoSuchNick401 {
                            client,
                            nick: nickname,
                        },
                    )
                    .await?;
                    false
                } else if chanobj.users.contains_key(&target_nick) {
                    self.feed_msg(
                        &mut conn_state.stream,
                        ErrUserOnChannel443 {
                            client,
                            nick: nickname,
                            channel,
                        },
                    )
                    .await?;
                    false
                } else {
                    true
                }
            } else {
                self.feed_msg(&mut conn_state.stream, ErrNotOnChannel442 { client, channel })
                    .await?;
                false
            }
        } else {
            self.feed_msg(&mut conn_state.stream, ErrNoSuchChannel403 { client, channel })
                .await?;
            false
        };

        if do_invite {
            let target = state.users.get_mut(&target_nick).unwrap();
            target.invited_to.insert(chname);
            target.send_message(msg, &conn_state.user_state.source)?;
            let away = target.away.clone();
            self.feed_msg(
                &mut conn_state.stream,
                RplInviting341 {
                    client,
                    nick: nickname,
                    channel,
                },
            )
            .await?;
            if let Some(ref away_msg) = away {
                self.feed_msg(
                    &mut conn_state.stream,
                    RplAway301 {
                        client,
                        nick: nickname,
                        message: away_msg,
                    },
                )
                .await?;
            }
        }
        Ok(())
    }

    pub(super) async fn process_kick<'a>(
        &self,
        conn_state: &mut ConnState,
        channel: &'a str,
        kick_user: &'a str,
        comment: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        let mut statem = self.state.write().await;
        let state = statem.deref_mut();
        let user_nick = self.folded(conn_state.user_state.nick.as_ref().unwrap());
        let chname = state.folded(channel);
        let target_nick = state.folded(kick_user);

        let do_kick = if let Some(chanobj) = state.channels.get(&chname) {
            if let Some(chum) = chanobj.users.get(&user_nick) {
                if !chum.is_half_operator() {
                    self.feed_msg(
                        &mut conn_state.stream,
                        ErrChanOpPrivsNeeded482 { client, channel },
                    )
                    .await?;
                    false
                } else if let Some(target_chum) = chanobj.users.get(&target_nick) {
                    // half-operator may not kick a full operator
                    if target_chum.is_operator() && !chum.is_operator() {
                        self.feed_msg(
                            &mut conn_state.stream,
                            ErrChanOpPrivsNeeded482 { client, channel },
                        )
                        .await?;
                        false
                    } else {
                        true
                    }
                } else {
                    self.feed_msg(
                        &mut conn_state.stream,
                        ErrUserNotInChannel441 {
                            client,
                            nick: kick_user,
                            channel,
                        },
                    )
                    .await?;
                    false
                }
            } else {
                self.feed_msg(&mut conn_state.stream, ErrNotOnChannel442 { client, channel })
                    .await?;
                false
            }
        } else {
            self.feed_msg(&mut conn_state.stream, ErrNoSuchChannel403 { client, channel })
                .await?;
            false
        };

        if do_kick {
            let kick_msg = format!(
                "KICK {} {} :{}",
                channel,
                kick_user,
                comment.unwrap_or("Kicked")
            );
            let chanobj = state.channels.get(&chname).unwrap();
            for nick in chanobj.users.keys() {
                state
                    .users
                    .get(nick)
                    .unwrap()
                    .send_msg_display(&conn_state.user_state.source, kick_msg.as_str())?;
            }
            state.remove_user_from_channel(&chname, &target_nick);
        }
        Ok(())
    }

    pub(super) async fn process_knock<'a>(
        &self,
        conn_state: &mut ConnState,
        channel: &'a str,
        message: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        let state = self.state.read().await;
        let user_nick = self.folded(conn_state.user_state.nick.as_ref().unwrap());
        let chname = state.folded(channel);

        let supports_invites = self
            .chantypes
            .by_prefix(channel.chars().next().unwrap())
            .map_or(false, |t| t.supports_invites);
        if let Some(chanobj) = state.channels.get(&chname) {
            if chanobj.users.contains_key(&user_nick) {
                self.feed_msg(&mut conn_state.stream, ErrKnockOnChan714 { client, channel })
                    .await?;
            } else if !supports_invites || !chanobj.modes.invite_only {
                self.feed_msg(&mut conn_state.stream, ErrChanOpen713 { client, channel })
                    .await?;
            } else {
                let knock_info = message.unwrap_or("no reason supplied");
                info!(
                    "User {} knocks to {}: {}",
                    conn_state.user_state.source, channel, knock_info
                );
                for (nick, chum) in &chanobj.users {
                    if chum.is_operator() {
                        let op = state.users.get(nick).unwrap();
                        op.send_msg_display(
                            &self.config.name,
                            RplKnock710 {
                                client: &op.nick,
                                channel,
                                source: &conn_state.user_state.source,
                            },
                        )?;
                    }
                }
                self.feed_msg(&mut conn_state.stream, RplKnockDlvr711 { client, channel })
                    .await?;
            }
        } else {
            self.feed_msg(&mut conn_state.stream, ErrNoSuchChannel403 { client, channel })
                .await?;
        }
        Ok(())
    }
}
