// conn_cmds.rs - connection commands
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
use std::sync::atomic::Ordering;

// capabilities advertised via CAP LS. none yet.
static SUPPORTED_CAPS: [&str; 0] = [];

impl super::MainState {
    pub(super) async fn process_cap<'a>(
        &self,
        conn_state: &mut ConnState,
        subcommand: CapCommand,
        caps: Option<Vec<&'a str>>,
        _: Option<u32>,
    ) -> Result<(), Box<dyn Error>> {
        match subcommand {
            CapCommand::LS => {
                conn_state.caps_negotation = true;
                self.feed_msg(
                    &mut conn_state.stream,
                    format!("CAP * LS :{}", SUPPORTED_CAPS.join(" ")),
                )
                .await
            }
            CapCommand::LIST => {
                self.feed_msg(&mut conn_state.stream, "CAP * LIST :").await
            }
            CapCommand::REQ => {
                conn_state.caps_negotation = true;
                if let Some(ref cs) = caps {
                    info!("CAPS REQ for {}: {:?}", conn_state.user_state.source, caps);
                    // no capability is offered, so nothing can be acknowledged
                    if cs.iter().all(|c| SUPPORTED_CAPS.contains(c)) {
                        self.feed_msg(
                            &mut conn_state.stream,
                            format!("CAP * ACK :{}", cs.join(" ")),
                        )
                        .await
                    } else {
                        self.feed_msg(
                            &mut conn_state.stream,
                            format!("CAP * NAK :{}", cs.join(" ")),
                        )
                        .await
                    }
                } else {
                    Ok(())
                }
            }
            CapCommand::END => {
                conn_state.caps_negotation = false;
                if !conn_state.user_state.authenticated {
                    self.authenticate(conn_state).await?;
                }
                Ok(())
            }
        }?;
        Ok(())
    }

    // send ISupport messages (Modern dialect only)
    pub(super) async fn send_isupport(
        &self,
        conn_state: &mut ConnState,
    ) -> Result<(), Box<dyn Error>> {
        let client = conn_state.user_state.client_name();
        // support tokens
        let mut tokens = vec![
            format!("NETWORK={}", self.config.network),
            "CASEMAPPING=ascii".to_string(),
            format!("CHANMODES={}", self.modes.chanmodes_token()),
            format!("CHANTYPES={}", self.chantypes.prefixes()),
            "EXCEPTS=e".to_string(),
            "INVEX=I".to_string(),
            "MAXLIST=beI:1000".to_string(),
            format!("PREFIX={}", self.modes.prefix_token()),
            "STATUSMSG=@%+".to_string(),
            format!("USERMODES={}", self.modes.usermodes_string()),
            format!("NICKLEN={}", self.config.max_nickname),
            format!("CHANNELLEN={}", self.config.max_channel_name),
            format!("LINELEN={}", self.config.max_line_length),
            "SILENCE=15".to_string(),
        ];
        if let Some(max_joins) = self.config.max_joins {
            tokens.push(format!(
                "CHANLIMIT={}:{}",
                self.chantypes.prefixes(),
                max_joins
            ));
            tokens.push(format!("MAXCHANNELS={}", max_joins));
        }

        tokens.sort();

        for toks in tokens.chunks(10) {
            self.feed_msg(
                &mut conn_state.stream,
                RplISupport005 {
                    client,
                    tokens: &toks.join(" "),
                },
            )
            .await?;
        }
        Ok(())
    }

    async fn authenticate(&self, conn_state: &mut ConnState) -> Result<(), Box<dyn Error>> {
        // registered - user that is defined in configuration
        let (auth_opt, registered) = {
            // finish of registration requires finished caps negotiation.
            if !conn_state.caps_negotation {
                let user_state = &mut conn_state.user_state;
                // nick and username must be defined
                if user_state.nick.is_some() {
                    if let Some(ref name) = user_state.name {
                        let mut registered = false;
                        // get password option
                        let password_opt = if let Some(uidx) = self.user_config_idxs.get(name) {
                            // match user mask
                            if let Some(ref users) = self.config.users {
                                if let Some(ref mask) = users[*uidx].mask {
                                    if match_wildcard(mask, &user_state.source) {
                                        registered = true;
                                        users[*uidx].password.as_ref()
                                    } else {
                                        info!(
                                            "Auth failed for {}: user mask doesn't match",
                                            user_state.source
                                        );
                                        self.feed_msg(
                                            &mut conn_state.stream,
                                            "ERROR :user mask doesn't match",
                                        )
                                        .await?;
                                        return Ok(());
                                    }
                                } else {
                                    registered = true;
                                    users[*uidx].password.as_ref()
                                }
                            } else {
                                None
                            }
                        } else {
                            None
                        }
                        // otherwise get default password from configuration
                        .or(self.config.password.as_ref());

                        if let Some(password) = password_opt {
                            // check password
                            let good = if let Some(ref entered_pwd) = user_state.password {
                                argon2_verify_password_async(
                                    entered_pwd.clone(),
                                    password.clone(),
                                )
                                .await
                                .is_ok()
                            } else {
                                false
                            };
                            (Some(good), registered)
                        } else {
                            (Some(true), registered)
                        }
                    } else {
                        (None, false)
                    }
                } else {
                    (None, false)
                }
            } else {
                (None, false)
            }
        };

        if let Some(good) = auth_opt {
            if !good {
                // wrong password while registering closes the connection.
                info!("Auth failed for {}", conn_state.user_state.source);
                conn_state.quit_reason = Some("Bad Password".to_string());
                conn_state.quit.store(1, Ordering::SeqCst);
                self.feed_msg(&mut conn_state.stream, "ERROR :Bad Password")
                    .await?;
                return Ok(());
            }

            let user_nick = conn_state.user_state.nick.clone().unwrap();
            let fnick = self.folded(&user_nick);
            let user_modes = {
                // add new user to the state
                let user_state = &mut conn_state.user_state;
                user_state.registered = registered;
                let mut state = self.state.write().await;
                if state.users.contains_key(&fnick) {
                    // if nick already used
                    drop(state);
                    let client = conn_state.user_state.client_name();
                    self.feed_msg(
                        &mut conn_state.stream,
                        ErrNicknameInUse433 {
                            client,
                            nick: &user_nick,
                        },
                    )
                    .await?;
                    return Ok(());
                }
                user_state.authenticated = true;
                let user = User::new(
                    &self.config,
                    user_state,
                    conn_state.sender.take().unwrap(),
                    conn_state.quit_sender.take().unwrap(),
                );
                let umode_str = user.modes.to_string();
                state.add_user(user);
                umode_str
            };

            {
                // send welcome messages
                let user_state = &conn_state.user_state;
                let client = user_state.client_name();
                self.feed_msg(
                    &mut conn_state.stream,
                    RplWelcome001 {
                        client,
                        networkname: &self.config.network,
                        nick: user_state.nick.as_deref().unwrap_or_default(),
                        user: user_state.name.as_deref().unwrap_or_default(),
                        host: &user_state.hostname,
                    },
                )
                .await?;
                self.feed_msg(
                    &mut conn_state.stream,
                    RplYourHost002 {
                        client,
                        servername: &self.config.name,
                        version: concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION")),
                    },
                )
                .await?;
                self.feed_msg(
                    &mut conn_state.stream,
                    RplCreated003 {
                        client,
                        datetime: &self.created,
                    },
                )
                .await?;
                self.feed_msg(
                    &mut conn_state.stream,
                    RplMyInfo004 {
                        client,
                        servername: &self.config.name,
                        version: concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION")),
                        avail_user_modes: &self.modes.usermodes_string(),
                        avail_chmodes: &self.modes.chanmodes_string(),
                    },
                )
                .await?;

                if self.config.dialect == Dialect::Modern {
                    self.send_isupport(conn_state).await?;
                }
            }

            // send messages from LUSERS and MOTD
            self.process_lusers(conn_state).await?;
            self.process_motd(conn_state, None).await?;

            // send mode reply
            let client = conn_state.user_state.client_name();
            self.feed_msg(
                &mut conn_state.stream,
                RplUModeIs221 {
                    client,
                    user_modes: &user_modes,
                },
            )
            .await?;

            // run ping waker for this connection
            conn_state.run_ping_waker(&self.config);
            info!("Auth succeed for {}", conn_state.user_state.source);
        }
        Ok(())
    }

    pub(super) async fn process_pass<'a>(
        &self,
        conn_state: &mut ConnState,
        pass: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        if !conn_state.user_state.authenticated {
            // PASS must precede NICK and USER.
            if conn_state.user_state.nick.is_some() || conn_state.user_state.name.is_some() {
                let client = conn_state.user_state.client_name();
                self.feed_msg(&mut conn_state.stream, ErrAlreadyRegistered462 { client })
                    .await?;
            } else {
                conn_state.user_state.password = Some(pass.to_string());
            }
        } else {
            let client = conn_state.user_state.client_name();
            self.feed_msg(&mut conn_state.stream, ErrAlreadyRegistered462 { client })
                .await?;
        }
        Ok(())
    }

    pub(super) async fn process_nick<'a>(
        &self,
        conn_state: &mut ConnState,
        nick: &'a str,
        msg: &'a Message<'a>,
    ) -> Result<(), Box<dyn Error>> {
        // dialect nickname grammar and length
        if !is_valid_nickname(self.config.dialect, nick) || nick.len() > self.config.max_nickname
        {
            let client = conn_state.user_state.client_name();
            self.feed_msg(&mut conn_state.stream, ErrErroneusNickname432 { client, nick })
                .await?;
            return Ok(());
        }
        let fnick = self.folded(nick);

        if !conn_state.user_state.authenticated {
            if !self.state.read().await.users.contains_key(&fnick) {
                conn_state.user_state.set_nick(nick.to_string());
                // try registration
                self.authenticate(conn_state).await?;
            } else {
                let client = conn_state.user_state.client_name();
                self.feed_msg(&mut conn_state.stream, ErrNicknameInUse433 { client, nick })
                    .await?;
            }
        } else {
            let mut statem = self.state.write().await;
            let state = statem.deref_mut();
            let old_nick = conn_state.user_state.nick.as_ref().unwrap().to_string();
            let old_fnick = state.folded(&old_nick);
            if nick == old_nick {
                return Ok(());
            }

            // a restricted connection may not change its nick.
            if state.users.get(&old_fnick).unwrap().modes.restricted {
                drop(statem);
                let client = conn_state.user_state.client_name();
                self.feed_msg(&mut conn_state.stream, ErrYourConnRestricted484 { client })
                    .await?;
                return Ok(());
            }

            if fnick != old_fnick && state.users.contains_key(&fnick) {
                // if nick in use
                drop(statem);
                let client = conn_state.user_state.client_name();
                self.feed_msg(&mut conn_state.stream, ErrNicknameInUse433 { client, nick })
                    .await?;
                return Ok(());
            }

            let old_source = conn_state.user_state.source.clone();
            let mut user = state.users.remove(&old_fnick).unwrap();
            conn_state.user_state.set_nick(nick.to_string());
            // old identity goes to the WHOWAS history
            state.insert_to_nick_history(user.history_entry.clone());
            user.update_nick(&conn_state.user_state);
            for ch in &user.channels {
                state
                    .channels
                    .get_mut(ch)
                    .unwrap()
                    .rename_user(&old_fnick, fnick.clone());
            }
            // wallops users
            if state.wallops_users.remove(&old_fnick) {
                state.wallops_users.insert(fnick.clone());
            }

            // announce to the renamer and everybody sharing a channel
            let mut recipients: HashSet<String> = [fnick.clone()].into();
            for ch in &user.channels {
                if let Some(chanobj) = state.channels.get(ch) {
                    recipients.extend(chanobj.users.keys().cloned());
                }
            }
            state.users.insert(fnick.clone(), user);
            for r in &recipients {
                state
                    .users
                    .get(r)
                    .unwrap()
                    .send_message(msg, &old_source)?;
            }
        }
        Ok(())
    }

    pub(super) async fn process_user<'a>(
        &self,
        conn_state: &mut ConnState,
        username: &'a str,
        _: &'a str,
        _: &'a str,
        realname: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        if !conn_state.user_state.authenticated {
            conn_state.user_state.set_name(username.to_string());
            conn_state.user_state.realname = Some(realname.to_string());
            // try registration
            self.authenticate(conn_state).await?;
        } else {
            let client = conn_state.user_state.client_name();
            self.feed_msg(&mut conn_state.stream, ErrAlreadyRegistered462 { client })
                .await?;
        }
        Ok(())
    }

    // server-to-server registration is a reserved extension point.
    pub(super) async fn process_server<'a>(
        &self,
        conn_state: &mut ConnState,
        name: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        info!(
            "SERVER {} from {} - linking not supported",
            name, conn_state.user_state.source
        );
        let client = conn_state.user_state.client_name();
        self.feed_msg(&mut conn_state.stream, ErrAlreadyRegistered462 { client })
            .await?;
        Ok(())
    }

    pub(super) async fn process_service<'a>(
        &self,
        conn_state: &mut ConnState,
        nickname: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        info!(
            "SERVICE {} from {} - services not supported",
            nickname, conn_state.user_state.source
        );
        let client = conn_state.user_state.client_name();
        self.feed_msg(&mut conn_state.stream, ErrAlreadyRegistered462 { client })
            .await?;
        Ok(())
    }

    pub(super) async fn process_error<'a>(
        &self,
        conn_state: &mut ConnState,
        message: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        // ERROR is a server-originated message. never answer it.
        info!(
            "ERROR from {}: {}",
            conn_state.user_state.source, message
        );
        Ok(())
    }

    pub(super) async fn process_ping<'a>(
        &self,
        conn_state: &mut ConnState,
        token: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        self.feed_msg(
            &mut conn_state.stream,
            format!("PONG {} :{}", self.config.name, token),
        )
        .await?;
        Ok(())
    }

    pub(super) async fn process_pong<'a>(
        &self,
        conn_state: &mut ConnState,
        _: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        if let Some(notifier) = conn_state.pong_notifier.take() {
            notifier
                .send(())
                .map_err(|_| "pong notifier error".to_string())?;
        }
        Ok(())
    }

    pub(super) async fn process_oper<'a>(
        &self,
        conn_state: &mut ConnState,
        name: &'a str,
        password: &'a str,
    ) -> Result<(), Box<dyn Error>> {
        let user_nick = conn_state.user_state.nick.as_ref().unwrap();
        let fnick = self.folded(user_nick);
        let client = conn_state.user_state.client_name();

        if let Some(oper_idx) = self.oper_config_idxs.get(name) {
            // if operator defined in configuration
            let mut state = self.state.write().await;
            let op_cfg_opt = self.config.operators.as_ref().unwrap().get(*oper_idx);
            let op_config = op_cfg_opt.as_ref().unwrap();

            // check password
            let do_it = if argon2_verify_password_async(
                password.to_string(),
                op_config.password.clone(),
            )
            .await
            .is_err()
            {
                self.feed_msg(&mut conn_state.stream, ErrPasswdMismatch464 { client })
                    .await?;
                false
            } else if let Some(ref op_mask) = op_config.mask {
                if !match_wildcard(op_mask, &conn_state.user_state.source) {
                    self.feed_msg(&mut conn_state.stream, ErrNoOperHost491 { client })
                        .await?;
                    false
                } else {
                    true
                }
            } else {
                true
            };

            if do_it {
                let user = state.users.get_mut(&fnick).unwrap();
                let was_oper = user.modes.is_local_oper();
                user.modes.oper = true;
                if !was_oper {
                    state.operators_count += 1;
                }
                info!("New IRC operator {}", conn_state.user_state.source);
                self.feed_msg(&mut conn_state.stream, RplYoureOper381 { client })
                    .await?;
            }
        } else {
            info!(
                "Operator authentication failed for {}",
                conn_state.user_state.source
            );
            self.feed_msg(&mut conn_state.stream, ErrNoOperHost491 { client })
                .await?;
        }
        Ok(())
    }

    pub(super) async fn process_quit<'a>(
        &self,
        conn_state: &mut ConnState,
        reason: Option<&'a str>,
    ) -> Result<(), Box<dyn Error>> {
        conn_state.quit_reason = Some(reason.unwrap_or("Client Quit").to_string());
        conn_state.quit.store(1, Ordering::SeqCst);
        info!("User {} quit", conn_state.user_state.source);
        self.feed_msg(&mut conn_state.stream, "ERROR :Closing connection")
            .await?;
        Ok(())
    }
}
