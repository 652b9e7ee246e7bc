// reply.rs - replies
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

use std::fmt;

#[derive(Clone)]
pub(crate) struct WhoIsChannelStruct<'a> {
    pub(crate) prefix: Option<String>,
    pub(crate) channel: &'a str,
}

#[derive(Clone)]
pub(crate) struct NameReplyStruct<'a> {
    pub(crate) prefix: String,
    pub(crate) nick: &'a str,
}

// all replies used by this IRC server.
pub(crate) enum Reply<'a> {
    RplWelcome001 {
        client: &'a str,
        networkname: &'a str,
        nick: &'a str,
        user: &'a str,
        host: &'a str,
    },
    RplYourHost002 {
        client: &'a str,
        servername: &'a str,
        version: &'a str,
    },
    RplCreated003 {
        client: &'a str,
        datetime: &'a str,
    },
    RplMyInfo004 {
        client: &'a str,
        servername: &'a str,
        version: &'a str,
        avail_user_modes: &'a str,
        avail_chmodes: &'a str,
    },
    RplISupport005 {
        client: &'a str,
        tokens: &'a str,
    },
    RplStatsCommands212 {
        client: &'a str,
        command: &'a str,
        count: u64,
    },
    RplEndOfStats219 {
        client: &'a str,
        stat: char,
    },
    RplUModeIs221 {
        client: &'a str,
        user_modes: &'a str,
    },
    RplServListEnd235 {
        client: &'a str,
        mask: &'a str,
        servtype: &'a str,
    },
    RplStatsUptime242 {
        client: &'a str,
        seconds: u64,
    },
    RplLUserClient251 {
        client: &'a str,
        users_num: usize,
        inv_users_num: usize,
        servers_num: usize,
    },
    RplLUserOp252 {
        client: &'a str,
        ops_num: usize,
    },
    RplLUserUnknown253 {
        client: &'a str,
        conns_num: usize,
    },
    RplLUserChannels254 {
        client: &'a str,
        channels_num: usize,
    },
    RplLUserMe255 {
        client: &'a str,
        clients_num: usize,
        servers_num: usize,
    },
    RplAdminMe256 {
        client: &'a str,
        server: &'a str,
    },
    RplAdminLoc1257 {
        client: &'a str,
        info: &'a str,
    },
    RplAdminLoc2258 {
        client: &'a str,
        info: &'a str,
    },
    RplAdminEmail259 {
        client: &'a str,
        email: &'a str,
    },
    RplTraceEnd262 {
        client: &'a str,
        server: &'a str,
    },
    RplLocalUsers265 {
        client: &'a str,
        clients_num: usize,
        max_clients_num: usize,
    },
    RplGlobalUsers266 {
        client: &'a str,
        clients_num: usize,
        max_clients_num: usize,
    },
    RplSilList271 {
        client: &'a str,
        mask: &'a str,
    },
    RplEndOfSilList272 {
        client: &'a str,
    },
    RplAway301 {
        client: &'a str,
        nick: &'a str,
        message: &'a str,
    },
    RplUserHost302 {
        client: &'a str,
        replies: &'a [String],
    },
    RplIson303 {
        client: &'a str,
        nicknames: &'a [&'a str],
    },
    RplUnAway305 {
        client: &'a str,
    },
    RplNowAway306 {
        client: &'a str,
    },
    RplWhoIsRegNick307 {
        client: &'a str,
        nick: &'a str,
    },
    RplWhoIsUser311 {
        client: &'a str,
        nick: &'a str,
        username: &'a str,
        host: &'a str,
        realname: &'a str,
    },
    RplWhoIsServer312 {
        client: &'a str,
        nick: &'a str,
        server: &'a str,
        server_info: &'a str,
    },
    RplWhoIsOperator313 {
        client: &'a str,
        nick: &'a str,
    },
    RplWhoWasUser314 {
        client: &'a str,
        nick: &'a str,
        username: &'a str,
        host: &'a str,
        realname: &'a str,
    },
    RplEndOfWho315 {
        client: &'a str,
        mask: &'a str,
    },
    RplwhoIsIdle317 {
        client: &'a str,
        nick: &'a str,
        secs: u64,
        signon: u64,
    },
    RplEndOfWhoIs318 {
        client: &'a str,
        nick: &'a str,
    },
    RplWhoIsChannels319 {
        client: &'a str,
        nick: &'a str,
        channels: &'a [WhoIsChannelStruct<'a>],
    },
    RplListStart321 {
        client: &'a str,
    },
    RplList322 {
        client: &'a str,
        channel: &'a str,
        client_count: usize,
        topic: &'a str,
    },
    RplListEnd323 {
        client: &'a str,
    },
    RplChannelModeIs324 {
        client: &'a str,
        channel: &'a str,
        modestring: &'a str,
    },
    RplCreationTime329 {
        client: &'a str,
        channel: &'a str,
        creation_time: u64,
    },
    RplNoTopic331 {
        client: &'a str,
        channel: &'a str,
    },
    RplTopic332 {
        client: &'a str,
        channel: &'a str,
        topic: &'a str,
    },
    RplTopicWhoTime333 {
        client: &'a str,
        channel: &'a str,
        nick: &'a str,
        setat: u64,
    },
    RplInviting341 {
        client: &'a str,
        nick: &'a str,
        channel: &'a str,
    },
    RplInviteList346 {
        client: &'a str,
        channel: &'a str,
        mask: &'a str,
    },
    RplEndOfInviteList347 {
        client: &'a str,
        channel: &'a str,
    },
    RplExceptList348 {
        client: &'a str,
        channel: &'a str,
        mask: &'a str,
    },
    RplEndOfExceptList349 {
        client: &'a str,
        channel: &'a str,
    },
    RplVersion351 {
        client: &'a str,
        version: &'a str,
        server: &'a str,
        comments: &'a str,
    },
    RplWhoReply352 {
        client: &'a str,
        channel: &'a str,
        username: &'a str,
        host: &'a str,
        server: &'a str,
        nick: &'a str,
        flags: &'a str,
        hopcount: usize,
        realname: &'a str,
    },
    RplNameReply353 {
        client: &'a str,
        symbol: &'a str,
        channel: &'a str,
        replies: &'a [NameReplyStruct<'a>],
    },
    RplEndOfLinks365 {
        client: &'a str,
        mask: &'a str,
    },
    RplEndOfNames366 {
        client: &'a str,
        channel: &'a str,
    },
    RplBanList367 {
        client: &'a str,
        channel: &'a str,
        mask: &'a str,
        who: &'a str,
        set_ts: u64,
    },
    RplEndOfBanList368 {
        client: &'a str,
        channel: &'a str,
    },
    RplEndOfWhoWas369 {
        client: &'a str,
        nick: &'a str,
    },
    RplInfo371 {
        client: &'a str,
        info: &'a str,
    },
    RplMotd372 {
        client: &'a str,
        motd: &'a str,
    },
    RplEndOfInfo374 {
        client: &'a str,
    },
    RplMotdStart375 {
        client: &'a str,
        server: &'a str,
    },
    RplEndOfMotd376 {
        client: &'a str,
    },
    RplWhoIsHost378 {
        client: &'a str,
        nick: &'a str,
        host_info: &'a str,
    },
    RplWhoIsModes379 {
        client: &'a str,
        nick: &'a str,
        modes: &'a str,
    },
    RplYoureOper381 {
        client: &'a str,
    },
    RplRehashing382 {
        client: &'a str,
        config_file: &'a str,
    },
    RplTime391 {
        client: &'a str,
        server: &'a str,
        timestamp: u64,
        ts_offset: &'a str,
        human_readable: &'a str,
    },
    ErrUnknownError400 {
        client: &'a str,
        command: &'a str,
        subcommand: Option<&'a str>,
        info: &'a str,
    },
    ErrNoSuchNick401 {
        client: &'a str,
        nick: &'a str,
    },
    ErrNoSuchServer402 {
        client: &'a str,
        server: &'a str,
    },
    ErrNoSuchChannel403 {
        client: &'a str,
        channel: &'a str,
    },
    ErrCannotSendToChan404 {
        client: &'a str,
        channel: &'a str,
    },
    ErrTooManyChannels405 {
        client: &'a str,
        channel: &'a str,
    },
    ErrWasNoSuchNick406 {
        client: &'a str,
        nick: &'a str,
    },
    ErrUnknownCommand421 {
        client: &'a str,
        command: &'a str,
    },
    ErrNoMotd422 {
        client: &'a str,
    },
    ErrErroneusNickname432 {
        client: &'a str,
        nick: &'a str,
    },
    ErrNicknameInUse433 {
        client: &'a str,
        nick: &'a str,
    },
    ErrUserNotInChannel441 {
        client: &'a str,
        nick: &'a str,
        channel: &'a str,
    },
    ErrNotOnChannel442 {
        client: &'a str,
        channel: &'a str,
    },
    ErrUserOnChannel443 {
        client: &'a str,
        nick: &'a str,
        channel: &'a str,
    },
    ErrSummonDisabled445 {
        client: &'a str,
    },
    ErrNotRegistered451 {
        client: &'a str,
    },
    ErrNeedMoreParams461 {
        client: &'a str,
        command: &'a str,
    },
    ErrAlreadyRegistered462 {
        client: &'a str,
    },
    ErrPasswdMismatch464 {
        client: &'a str,
    },
    ErrChannelIsFull471 {
        client: &'a str,
        channel: &'a str,
    },
    ErrUnknownMode472 {
        client: &'a str,
        modechar: char,
        channel: &'a str,
    },
    ErrInviteOnlyChan473 {
        client: &'a str,
        channel: &'a str,
    },
    ErrBannedFromChan474 {
        client: &'a str,
        channel: &'a str,
    },
    ErrBadChannelKey475 {
        client: &'a str,
        channel: &'a str,
    },
    ErrNoPrivileges481 {
        client: &'a str,
    },
    ErrChanOpPrivsNeeded482 {
        client: &'a str,
        channel: &'a str,
    },
    ErrYourConnRestricted484 {
        client: &'a str,
    },
    ErrNoOperHost491 {
        client: &'a str,
    },
    ErrUmodeUnknownFlag501 {
        client: &'a str,
    },
    ErrUsersDontMatch502 {
        client: &'a str,
    },
    ErrSilListFull511 {
        client: &'a str,
        mask: &'a str,
    },
    ErrInvalidModeParam696 {
        client: &'a str,
        target: &'a str,
        modechar: char,
        param: &'a str,
        description: &'a str,
    },
    RplKnock710 {
        client: &'a str,
        channel: &'a str,
        source: &'a str,
    },
    RplKnockDlvr711 {
        client: &'a str,
        channel: &'a str,
    },
    ErrChanOpen713 {
        client: &'a str,
        channel: &'a str,
    },
    ErrKnockOnChan714 {
        client: &'a str,
        channel: &'a str,
    },
}

use Reply::*;

impl<'a> fmt::Display for Reply<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RplWelcome001 {
                client,
                networkname,
                nick,
                user,
                host,
            } => {
                write!(
                    f,
                    "001 {} :Welcome to the {} Network, {}!~{}@{}",
                    client, networkname, nick, user, host
                )
            }
            RplYourHost002 {
                client,
                servername,
                version,
            } => {
                write!(
                    f,
                    "002 {} :Your host is {}, running version {}",
                    client, servername, version
                )
            }
            RplCreated003 { client, datetime } => {
                write!(f, "003 {} :This server was created {}", client, datetime)
            }
            RplMyInfo004 {
                client,
                servername,
                version,
                avail_user_modes,
                avail_chmodes,
            } => {
                write!(
                    f,
                    "004 {} {} {} {} {}",
                    client, servername, version, avail_user_modes, avail_chmodes
                )
            }
            RplISupport005 { client, tokens } => {
                write!(f, "005 {} {} :are supported by this server", client, tokens)
            }
            RplStatsCommands212 {
                client,
                command,
                count,
            } => {
                write!(f, "212 {} {} {}", client, command, count)
            }
            RplEndOfStats219 { client, stat } => {
                write!(f, "219 {} {} :End of STATS report", client, stat)
            }
            RplUModeIs221 { client, user_modes } => {
                write!(f, "221 {} {}", client, user_modes)
            }
            RplServListEnd235 {
                client,
                mask,
                servtype,
            } => {
                write!(
                    f,
                    "235 {} {} {} :End of service listing",
                    client, mask, servtype
                )
            }
            RplStatsUptime242 { client, seconds } => {
                let day_time = seconds % (24 * 3600);
                let hour = day_time / 3600;
                let minute = (day_time - hour * 3600) / 60;
                let second = day_time % 60;
                write!(
                    f,
                    "242 {} :Server Up {} days {}:{:02}:{:02}",
                    client,
                    seconds / (24 * 3600),
                    hour,
                    minute,
                    second
                )
            }
            RplLUserClient251 {
                client,
                users_num,
                inv_users_num,
                servers_num,
            } => {
                write!(
                    f,
                    "251 {} :There are {} users and {} invisible on {} servers",
                    client, users_num, inv_users_num, servers_num
                )
            }
            RplLUserOp252 { client, ops_num } => {
                write!(f, "252 {} {} :operator(s) online", client, ops_num)
            }
            RplLUserUnknown253 { client, conns_num } => {
                write!(f, "253 {} {} :unknown connection(s)", client, conns_num)
            }
            RplLUserChannels254 {
                client,
                channels_num,
            } => {
                write!(f, "254 {} {} :channels formed", client, channels_num)
            }
            RplLUserMe255 {
                client,
                clients_num,
                servers_num,
            } => {
                write!(
                    f,
                    "255 {} :I have {} clients and {} servers",
                    client, clients_num, servers_num
                )
            }
            RplAdminMe256 { client, server } => {
                write!(f, "256 {} {} :Administrative info", client, server)
            }
            RplAdminLoc1257 { client, info } => {
                write!(f, "257 {} :{}", client, info)
            }
            RplAdminLoc2258 { client, info } => {
                write!(f, "258 {} :{}", client, info)
            }
            RplAdminEmail259 { client, email } => {
                write!(f, "259 {} :{}", client, email)
            }
            RplTraceEnd262 { client, server } => {
                write!(f, "262 {} {} :End of TRACE", client, server)
            }
            RplLocalUsers265 {
                client,
                clients_num,
                max_clients_num,
            } => {
                write!(
                    f,
                    "265 {} {} {} :Current local users {}, max {}",
                    client, clients_num, max_clients_num, clients_num, max_clients_num
                )
            }
            RplGlobalUsers266 {
                client,
                clients_num,
                max_clients_num,
            } => {
                write!(
                    f,
                    "266 {} {} {} :Current global users {}, max {}",
                    client, clients_num, max_clients_num, clients_num, max_clients_num
                )
            }
            RplSilList271 { client, mask } => {
                write!(f, "271 {} {}", client, mask)
            }
            RplEndOfSilList272 { client } => {
                write!(f, "272 {} :End of Silence List", client)
            }
            RplAway301 {
                client,
                nick,
                message,
            } => {
                write!(f, "301 {} {} :{}", client, nick, message)
            }
            RplUserHost302 { client, replies } => {
                write!(
                    f,
                    "302 {} :{}",
                    client,
                    replies
                        .iter()
                        .map(|x| x.to_string())
                        .collect::<Vec<_>>()
                        .join(" ")
                )
            }
            RplIson303 { client, nicknames } => {
                write!(
                    f,
                    "303 {} :{}",
                    client,
                    nicknames
                        .iter()
                        .map(|x| x.to_string())
                        .collect::<Vec<_>>()
                        .join(" ")
                )
            }
            RplUnAway305 { client } => {
                write!(f, "305 {} :You are no longer marked as being away", client)
            }
            RplNowAway306 { client } => {
                write!(f, "306 {} :You have been marked as being away", client)
            }
            RplWhoIsRegNick307 { client, nick } => {
                write!(f, "307 {} {} :has identified for this nick", client, nick)
            }
            RplWhoIsUser311 {
                client,
                nick,
                username,
                host,
                realname,
            } => {
                write!(
                    f,
                    "311 {} {} ~{} {} * :{}",
                    client, nick, username, host, realname
                )
            }
            RplWhoIsServer312 {
                client,
                nick,
                server,
                server_info,
            } => {
                write!(f, "312 {} {} {} :{}", client, nick, server, server_info)
            }
            RplWhoIsOperator313 { client, nick } => {
                write!(f, "313 {} {} :is an IRC operator", client, nick)
            }
            RplWhoWasUser314 {
                client,
                nick,
                username,
                host,
                realname,
            } => {
                write!(
                    f,
                    "314 {} {} ~{} {} * :{}",
                    client, nick, username, host, realname
                )
            }
            RplEndOfWho315 { client, mask } => {
                write!(f, "315 {} {} :End of WHO list", client, mask)
            }
            RplwhoIsIdle317 {
                client,
                nick,
                secs,
                signon,
            } => {
                write!(
                    f,
                    "317 {} {} {} {} :seconds idle, signon time",
                    client, nick, secs, signon
                )
            }
            RplEndOfWhoIs318 { client, nick } => {
                write!(f, "318 {} {} :End of /WHOIS list", client, nick)
            }
            RplWhoIsChannels319 {
                client,
                nick,
                channels,
            } => {
                write!(
                    f,
                    "319 {} {} :{}",
                    client,
                    nick,
                    channels
                        .iter()
                        .map(|c| {
                            if let Some(ref prefix) = c.prefix {
                                prefix.to_string() + c.channel
                            } else {
                                c.channel.to_string()
                            }
                        })
                        .collect::<Vec<_>>()
                        .join(" ")
                )
            }
            RplListStart321 { client } => {
                write!(f, "321 {} Channel :Users  Name", client)
            }
            RplList322 {
                client,
                channel,
                client_count,
                topic,
            } => {
                write!(f, "322 {} {} {} :{}", client, channel, client_count, topic)
            }
            RplListEnd323 { client } => {
                write!(f, "323 {} :End of /LIST", client)
            }
            RplChannelModeIs324 {
                client,
                channel,
                modestring,
            } => {
                write!(f, "324 {} {} {}", client, channel, modestring)
            }
            RplCreationTime329 {
                client,
                channel,
                creation_time,
            } => {
                write!(f, "329 {} {} {}", client, channel, creation_time)
            }
            RplNoTopic331 { client, channel } => {
                write!(f, "331 {} {} :No topic is set", client, channel)
            }
            RplTopic332 {
                client,
                channel,
                topic,
            } => {
                write!(f, "332 {} {} :{}", client, channel, topic)
            }
            RplTopicWhoTime333 {
                client,
                channel,
                nick,
                setat,
            } => {
                write!(f, "333 {} {} {} {}", client, channel, nick, setat)
            }
            RplInviting341 {
                client,
                nick,
                channel,
            } => {
                write!(f, "341 {} {} {}", client, nick, channel)
            }
            RplInviteList346 {
                client,
                channel,
                mask,
            } => {
                write!(f, "346 {} {} {}", client, channel, mask)
            }
            RplEndOfInviteList347 { client, channel } => {
                write!(f, "347 {} {} :End of channel invite list", client, channel)
            }
            RplExceptList348 {
                client,
                channel,
                mask,
            } => {
                write!(f, "348 {} {} {}", client, channel, mask)
            }
            RplEndOfExceptList349 { client, channel } => {
                write!(
                    f,
                    "349 {} {} :End of channel exception list",
                    client, channel
                )
            }
            RplVersion351 {
                client,
                version,
                server,
                comments,
            } => {
                write!(f, "351 {} {} {} :{}", client, version, server, comments)
            }
            RplWhoReply352 {
                client,
                channel,
                username,
                host,
                server,
                nick,
                flags,
                hopcount,
                realname,
            } => {
                write!(
                    f,
                    "352 {} {} ~{} {} {} {} {} :{} {}",
                    client, channel, username, host, server, nick, flags, hopcount, realname
                )
            }
            RplNameReply353 {
                client,
                symbol,
                channel,
                replies,
            } => {
                write!(
                    f,
                    "353 {} {} {} :{}",
                    client,
                    symbol,
                    channel,
                    replies
                        .iter()
                        .map(|r| { r.prefix.to_string() + r.nick })
                        .collect::<Vec<_>>()
                        .join(" ")
                )
            }
            RplEndOfLinks365 { client, mask } => {
                write!(f, "365 {} {} :End of LINKS list", client, mask)
            }
            RplEndOfNames366 { client, channel } => {
                write!(f, "366 {} {} :End of /NAMES list", client, channel)
            }
            RplBanList367 {
                client,
                channel,
                mask,
                who,
                set_ts,
            } => {
                write!(f, "367 {} {} {} {} {}", client, channel, mask, who, set_ts)
            }
            RplEndOfBanList368 { client, channel } => {
                write!(f, "368 {} {} :End of channel ban list", client, channel)
            }
            RplEndOfWhoWas369 { client, nick } => {
                write!(f, "369 {} {} :End of WHOWAS", client, nick)
            }
            RplInfo371 { client, info } => {
                write!(f, "371 {} :{}", client, info)
            }
            RplMotd372 { client, motd } => {
                write!(f, "372 {} :{}", client, motd)
            }
            RplEndOfInfo374 { client } => {
                write!(f, "374 {} :End of INFO list", client)
            }
            RplMotdStart375 { client, server } => {
                write!(f, "375 {} :- {} Message of the day - ", client, server)
            }
            RplEndOfMotd376 { client } => {
                write!(f, "376 {} :End of /MOTD command.", client)
            }
            RplWhoIsHost378 {
                client,
                nick,
                host_info,
            } => {
                write!(
                    f,
                    "378 {} {} :is connecting from {}",
                    client, nick, host_info
                )
            }
            RplWhoIsModes379 {
                client,
                nick,
                modes,
            } => {
                write!(f, "379 {} {} :is using modes {}", client, nick, modes)
            }
            RplYoureOper381 { client } => {
                write!(f, "381 {} :You are now an IRC operator", client)
            }
            RplRehashing382 {
                client,
                config_file,
            } => {
                write!(f, "382 {} {} :Rehashing", client, config_file)
            }
            RplTime391 {
                client,
                server,
                timestamp,
                ts_offset,
                human_readable,
            } => {
                write!(
                    f,
                    "391 {} {} {} {} :{}",
                    client, server, timestamp, ts_offset, human_readable
                )
            }
            ErrUnknownError400 {
                client,
                command,
                subcommand,
                info,
            } => {
                if let Some(sc) = subcommand {
                    write!(f, "400 {} {} {} :{}", client, command, sc, info)
                } else {
                    write!(f, "400 {} {} :{}", client, command, info)
                }
            }
            ErrNoSuchNick401 { client, nick } => {
                write!(f, "401 {} {} :No such nick/channel", client, nick)
            }
            ErrNoSuchServer402 { client, server } => {
                write!(f, "402 {} {} :No such server", client, server)
            }
            ErrNoSuchChannel403 { client, channel } => {
                write!(f, "403 {} {} :No such channel", client, channel)
            }
            ErrCannotSendToChan404 { client, channel } => {
                write!(f, "404 {} {} :Cannot send to channel", client, channel)
            }
            ErrTooManyChannels405 { client, channel } => {
                write!(
                    f,
                    "405 {} {} :You have joined too many channels",
                    client, channel
                )
            }
            ErrWasNoSuchNick406 { client, nick } => {
                write!(f, "406 {} {} :There was no such nickname", client, nick)
            }
            ErrUnknownCommand421 { client, command } => {
                write!(f, "421 {} {} :Unknown command", client, command)
            }
            ErrNoMotd422 { client } => {
                write!(f, "422 {} :MOTD File is missing", client)
            }
            ErrErroneusNickname432 { client, nick } => {
                write!(f, "432 {} {} :Erroneus nickname", client, nick)
            }
            ErrNicknameInUse433 { client, nick } => {
                write!(f, "433 {} {} :Nickname is already in use", client, nick)
            }
            ErrUserNotInChannel441 {
                client,
                nick,
                channel,
            } => {
                write!(
                    f,
                    "441 {} {} {} :They aren't on that channel",
                    client, nick, channel
                )
            }
            ErrNotOnChannel442 { client, channel } => {
                write!(f, "442 {} {} :You're not on that channel", client, channel)
            }
            ErrUserOnChannel443 {
                client,
                nick,
                channel,
            } => {
                write!(
                    f,
                    "443 {} {} {} :is already on channel",
                    client, nick, channel
                )
            }
            ErrSummonDisabled445 { client } => {
                write!(f, "445 {} :SUMMON has been disabled", client)
            }
            ErrNotRegistered451 { client } => {
                write!(f, "451 {} :You have not registered", client)
            }
            ErrNeedMoreParams461 { client, command } => {
                write!(f, "461 {} {} :Not enough parameters", client, command)
            }
            ErrAlreadyRegistered462 { client } => {
                write!(f, "462 {} :You may not reregister", client)
            }
            ErrPasswdMismatch464 { client } => {
                write!(f, "464 {} :Password incorrect", client)
            }
            ErrChannelIsFull471 { client, channel } => {
                write!(f, "471 {} {} :Cannot join channel (+l)", client, channel)
            }
            ErrUnknownMode472 {
                client,
                modechar,
                channel,
            } => {
                write!(
                    f,
                    "472 {} {} :is unknown mode char for {}",
                    client, modechar, channel
                )
            }
            ErrInviteOnlyChan473 { client, channel } => {
                write!(f, "473 {} {} :Cannot join channel (+i)", client, channel)
            }
            ErrBannedFromChan474 { client, channel } => {
                write!(f, "474 {} {} :Cannot join channel (+b)", client, channel)
            }
            ErrBadChannelKey475 { client, channel } => {
                write!(f, "475 {} {} :Cannot join channel (+k)", client, channel)
            }
            ErrNoPrivileges481 { client } => {
                write!(
                    f,
                    "481 {} :Permission Denied- You're not an IRC operator",
                    client
                )
            }
            ErrChanOpPrivsNeeded482 { client, channel } => {
                write!(f, "482 {} {} :You're not channel operator", client, channel)
            }
            ErrYourConnRestricted484 { client } => {
                write!(f, "484 {} :Your connection is restricted!", client)
            }
            ErrNoOperHost491 { client } => {
                write!(f, "491 {} :No O-lines for your host", client)
            }
            ErrUmodeUnknownFlag501 { client } => {
                write!(f, "501 {} :Unknown MODE flag", client)
            }
            ErrUsersDontMatch502 { client } => {
                write!(f, "502 {} :Cant change mode for other users", client)
            }
            ErrSilListFull511 { client, mask } => {
                write!(f, "511 {} {} :Your silence list is full", client, mask)
            }
            ErrInvalidModeParam696 {
                client,
                target,
                modechar,
                param,
                description,
            } => {
                write!(
                    f,
                    "696 {} {} {} {} :{}",
                    client, target, modechar, param, description
                )
            }
            RplKnock710 {
                client,
                channel,
                source,
            } => {
                write!(
                    f,
                    "710 {} {} {} :has asked for an invite",
                    client, channel, source
                )
            }
            RplKnockDlvr711 { client, channel } => {
                write!(
                    f,
                    "711 {} {} :Your KNOCK has been delivered",
                    client, channel
                )
            }
            ErrChanOpen713 { client, channel } => {
                write!(f, "713 {} {} :Channel is open", client, channel)
            }
            ErrKnockOnChan714 { client, channel } => {
                write!(
                    f,
                    "714 {} {} :You are already on that channel",
                    client, channel
                )
            }
        }
    }
}
