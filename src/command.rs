// command.rs - commands
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

use const_table::const_table;
use std::error::Error;
use std::fmt;

use crate::config::Dialect;
use crate::utils::{
    validate_channel, validate_prefixed_channel, validate_server, validate_server_mask,
    validate_username,
};

#[derive(Clone, Copy, Debug)]
pub(crate) enum MessageError {
    Empty,
    WrongSource,
    NoCommand,
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageError::Empty => write!(f, "Message is empty"),
            MessageError::WrongSource => write!(f, "Wrong source syntax"),
            MessageError::NoCommand => write!(f, "No command"),
        }
    }
}

impl Error for MessageError {}

#[derive(PartialEq, Eq, Debug)]
pub(crate) struct Message<'a> {
    pub(crate) source: Option<&'a str>,
    pub(crate) command: &'a str,
    pub(crate) params: Vec<&'a str>,
}

fn validate_source(s: &str) -> bool {
    if s.contains(':') {
        false
    } else {
        let excl = s.find('!');
        let atchar = s.find('@');
        if let Some(excl_pos) = excl {
            if let Some(atchar_pos) = atchar {
                return excl_pos < atchar_pos;
            }
        }
        true
    }
}

impl<'a> Message<'a> {
    pub(crate) fn from_shared_str(input: &'a str) -> Result<Self, MessageError> {
        let trimmed = input.trim_start();

        if !trimmed.is_empty() {
            // start_pos after ':' if exists - to skip ':' before source
            let start_pos = if trimmed.bytes().next() == Some(b':') {
                1
            } else {
                0
            };
            let (rest, last_param) = if let Some((rest, lp)) = trimmed[start_pos..].split_once(" :")
            {
                (&trimmed[0..rest.len() + start_pos], Some(lp))
            } else {
                (trimmed, None)
            };

            let mut rest_words = rest.split_ascii_whitespace();
            // find source
            let source = if rest.bytes().next() == Some(b':') {
                let s = &rest_words.next().unwrap()[1..];
                if !validate_source(s) {
                    return Err(MessageError::WrongSource);
                }
                Some(s)
            } else {
                None
            };
            let command = if let Some(cmd) = rest_words.next() {
                cmd
            } else {
                return Err(MessageError::NoCommand);
            };

            let mut params = rest_words.collect::<Vec<_>>();
            if let Some(lp) = last_param {
                params.push(lp); // add last parameter
            }

            Ok(Message {
                source,
                command,
                params,
            })
        } else {
            Err(MessageError::Empty)
        }
    }

    // true if the command token is a three-digit numeric reply code.
    pub(crate) fn is_numeric(&self) -> bool {
        self.command.len() == 3 && self.command.bytes().all(|c| c.is_ascii_digit())
    }

    // serialize with the given source prefix; the last parameter gets a ':'
    // if it is empty, contains a space or starts with ':'.
    pub(crate) fn to_string_with_source(&self, source: &str) -> String {
        let mut out = format!(":{} {}", source, self.command);
        if let Some((last, rest)) = self.params.split_last() {
            for p in rest {
                out.push(' ');
                out.push_str(p);
            }
            out.push(' ');
            if last.is_empty() || last.contains(' ') || last.starts_with(':') {
                out.push(':');
            }
            out.push_str(last);
        }
        out
    }
}

#[const_table]
pub(crate) enum CommandId {
    CommandName { pub name: &'static str },
    CAPId = CommandName { name: "CAP" },
    PASSId = CommandName { name: "PASS" },
    NICKId = CommandName { name: "NICK" },
    USERId = CommandName { name: "USER" },
    SERVERId = CommandName { name: "SERVER" },
    SERVICEId = CommandName { name: "SERVICE" },
    PINGId = CommandName { name: "PING" },
    PONGId = CommandName { name: "PONG" },
    OPERId = CommandName { name: "OPER" },
    QUITId = CommandName { name: "QUIT" },
    ERRORId = CommandName { name: "ERROR" },
    JOINId = CommandName { name: "JOIN" },
    PARTId = CommandName { name: "PART" },
    TOPICId = CommandName { name: "TOPIC" },
    NAMESId = CommandName { name: "NAMES" },
    LISTId = CommandName { name: "LIST" },
    INVITEId = CommandName { name: "INVITE" },
    KICKId = CommandName { name: "KICK" },
    KNOCKId = CommandName { name: "KNOCK" },
    MOTDId = CommandName { name: "MOTD" },
    VERSIONId = CommandName { name: "VERSION" },
    ADMINId = CommandName { name: "ADMIN" },
    CONNECTId = CommandName { name: "CONNECT" },
    LUSERSId = CommandName { name: "LUSERS" },
    TIMEId = CommandName { name: "TIME" },
    STATSId = CommandName { name: "STATS" },
    LINKSId = CommandName { name: "LINKS" },
    TRACEId = CommandName { name: "TRACE" },
    INFOId = CommandName { name: "INFO" },
    MODEId = CommandName { name: "MODE" },
    PRIVMSGId = CommandName { name: "PRIVMSG" },
    NOTICEId = CommandName { name: "NOTICE" },
    SERVLISTId = CommandName { name: "SERVLIST" },
    SQUERYId = CommandName { name: "SQUERY" },
    WHOId = CommandName { name: "WHO" },
    WHOISId = CommandName { name: "WHOIS" },
    WHOWASId = CommandName { name: "WHOWAS" },
    KILLId = CommandName { name: "KILL" },
    DIEId = CommandName { name: "DIE" },
    REHASHId = CommandName { name: "REHASH" },
    RESTARTId = CommandName { name: "RESTART" },
    SQUITId = CommandName { name: "SQUIT" },
    AWAYId = CommandName { name: "AWAY" },
    ISONId = CommandName { name: "ISON" },
    USERHOSTId = CommandName { name: "USERHOST" },
    WALLOPSId = CommandName { name: "WALLOPS" },
    SUMMONId = CommandName { name: "SUMMON" },
    SILENCEId = CommandName { name: "SILENCE" },
    LANGUAGEId = CommandName { name: "LANGUAGE" },
}

use CommandId::*;

#[derive(Clone, Debug)]
pub(crate) enum CommandError {
    UnknownCommand(String),
    UnknownSubcommand(CommandId, String),
    NeedMoreParams(CommandId),
    ParameterDoesntMatch(CommandId, usize),
    WrongParameter(CommandId, usize),
    UnknownMode(usize, char, String),
    UnknownUModeFlag(usize),
    InvalidModeParam {
        target: String,
        modechar: char,
        param: String,
        description: String,
    },
}

use CommandError::*;

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownCommand(s) => write!(f, "Unknown command '{}'", s),
            UnknownSubcommand(cmd, scmd) => {
                write!(f, "Unknown subcommand '{}' in command '{}'", scmd, cmd.name)
            }
            NeedMoreParams(s) => write!(f, "Command '{}' needs more parameters", s.name),
            ParameterDoesntMatch(s, i) => {
                write!(f, "Parameter {} doesn't match for command '{}'", i, s.name)
            }
            WrongParameter(s, i) => write!(f, "Wrong parameter {} in command '{}'", i, s.name),
            UnknownMode(i, c, _) => write!(f, "Unknown mode {} in parameter {}", c, i),
            UnknownUModeFlag(i) => write!(f, "Unknown umode flag in parameter {}", i),
            InvalidModeParam {
                target,
                modechar,
                param,
                description,
            } => write!(
                f,
                "Invalid mode parameter: {} {} {} {}",
                target, modechar, param, description
            ),
        }
    }
}

impl Error for CommandError {}

#[derive(PartialEq, Eq, Debug)]
pub(crate) enum CapCommand {
    LS,
    LIST,
    REQ,
    END,
}

// which dialects expose a command.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum DialectGate {
    All,
    Rfc2810Up,
    ModernOnly,
}

impl DialectGate {
    pub(crate) fn enabled(&self, dialect: Dialect) -> bool {
        match self {
            DialectGate::All => true,
            DialectGate::Rfc2810Up => dialect != Dialect::Rfc1459,
            DialectGate::ModernOnly => dialect == Dialect::Modern,
        }
    }
}

#[derive(PartialEq, Eq, Debug)]
pub(crate) enum Command<'a> {
    CAP {
        subcommand: CapCommand,
        caps: Option<Vec<&'a str>>,
        version: Option<u32>,
    },
    PASS {
        password: &'a str,
    },
    NICK {
        nickname: &'a str,
    },
    USER {
        username: &'a str,
        hostname: &'a str,
        servername: &'a str,
        realname: &'a str,
    },
    SERVER {
        name: &'a str,
    },
    SERVICE {
        nickname: &'a str,
    },
    PING {
        token: &'a str,
    },
    PONG {
        token: &'a str,
    },
    OPER {
        name: &'a str,
        password: &'a str,
    },
    QUIT {
        reason: Option<&'a str>,
    },
    ERROR {
        message: &'a str,
    },
    JOIN {
        channels: Vec<&'a str>,
        keys: Option<Vec<&'a str>>,
    },
    PART {
        channels: Vec<&'a str>,
        reason: Option<&'a str>,
    },
    TOPIC {
        channel: &'a str,
        topic: Option<&'a str>,
    },
    NAMES {
        channels: Vec<&'a str>,
    },
    LIST {
        channels: Vec<&'a str>,
        server: Option<&'a str>,
    },
    INVITE {
        nickname: &'a str,
        channel: &'a str,
    },
    KICK {
        channel: &'a str,
        user: &'a str,
        comment: Option<&'a str>,
    },
    KNOCK {
        channel: &'a str,
        message: Option<&'a str>,
    },
    MOTD {
        target: Option<&'a str>,
    },
    VERSION {
        target: Option<&'a str>,
    },
    ADMIN {
        target: Option<&'a str>,
    },
    CONNECT {
        target_server: &'a str,
        port: Option<u16>,
        remote_server: Option<&'a str>,
    },
    LUSERS {},
    TIME {
        server: Option<&'a str>,
    },
    STATS {
        query: char,
        server: Option<&'a str>,
    },
    LINKS {
        remote_server: Option<&'a str>,
        server_mask: Option<&'a str>,
    },
    TRACE {
        target: Option<&'a str>,
    },
    INFO {},
    MODE {
        target: &'a str,
        modes: Vec<(&'a str, Vec<&'a str>)>,
    },
    PRIVMSG {
        targets: Vec<&'a str>,
        text: &'a str,
    },
    NOTICE {
        targets: Vec<&'a str>,
        text: &'a str,
    },
    SERVLIST {
        mask: Option<&'a str>,
        servtype: Option<&'a str>,
    },
    SQUERY {
        servicename: &'a str,
        text: &'a str,
    },
    WHO {
        mask: &'a str,
    },
    WHOIS {
        target: Option<&'a str>,
        nickmasks: Vec<&'a str>,
    },
    WHOWAS {
        nickname: &'a str,
        count: Option<usize>,
        server: Option<&'a str>,
    },
    KILL {
        nickname: &'a str,
        comment: &'a str,
    },
    DIE {},
    REHASH {},
    RESTART {},
    SQUIT {
        server: &'a str,
        comment: &'a str,
    },
    AWAY {
        text: Option<&'a str>,
    },
    ISON {
        nicknames: Vec<&'a str>,
    },
    USERHOST {
        nicknames: Vec<&'a str>,
    },
    WALLOPS {
        text: &'a str,
    },
    SUMMON {
        user: &'a str,
    },
    SILENCE {
        mask: Option<&'a str>,
    },
    LANGUAGE {
        langs: Vec<&'a str>,
    },
}

use Command::*;

pub(crate) fn validate_usermodes<'a>(
    modes: &Vec<(&'a str, Vec<&'a str>)>,
) -> Result<(), CommandError> {
    let mut param_idx = 1;
    modes.iter().try_for_each(|(ms, margs)| {
        if !ms.is_empty() {
            if ms
                .find(|c| c != '+' && c != '-' && c != 'i' && c != 'o' && c != 'O' && c != 'r' && c != 'w')
                .is_some()
            {
                Err(UnknownUModeFlag(param_idx))
            } else if !margs.is_empty() {
                Err(WrongParameter(MODEId, param_idx))
            } else {
                param_idx += 1;
                Ok(())
            }
        } else {
            // if empty
            Err(WrongParameter(MODEId, param_idx))
        }
    })
}

pub(crate) fn validate_channelmodes<'a>(
    target: &'a str,
    modes: &Vec<(&'a str, Vec<&'a str>)>,
) -> Result<(), CommandError> {
    let mut param_idx = 1;
    modes.iter().try_for_each(|(ms, margs)| {
        if !ms.is_empty() {
            let mut mode_set = false;
            let mut margs_it = margs.iter();

            ms.chars().try_for_each(|c| {
                match c {
                    '+' => {
                        mode_set = true;
                    }
                    '-' => {
                        mode_set = false;
                    }
                    'b' | 'e' | 'I' => {
                        margs_it.next(); // consume argument
                    }
                    'o' | 'v' | 'h' => {
                        if let Some(arg) = margs_it.next() {
                            validate_username(arg).map_err(|e| InvalidModeParam {
                                target: target.to_string(),
                                modechar: c,
                                param: arg.to_string(),
                                description: e.to_string(),
                            })?;
                        } else {
                            return Err(InvalidModeParam {
                                target: target.to_string(),
                                modechar: c,
                                param: "".to_string(),
                                description: "No argument".to_string(),
                            });
                        }
                    }
                    'l' => {
                        if mode_set {
                            if let Some(arg) = margs_it.next() {
                                match arg.parse::<usize>() {
                                    Ok(0) => {
                                        return Err(InvalidModeParam {
                                            target: target.to_string(),
                                            modechar: c,
                                            param: arg.to_string(),
                                            description: "Client limit must be positive"
                                                .to_string(),
                                        });
                                    }
                                    Err(e) => {
                                        return Err(InvalidModeParam {
                                            target: target.to_string(),
                                            modechar: c,
                                            param: arg.to_string(),
                                            description: e.to_string(),
                                        });
                                    }
                                    Ok(_) => {}
                                }
                            } else {
                                return Err(InvalidModeParam {
                                    target: target.to_string(),
                                    modechar: c,
                                    param: "".to_string(),
                                    description: "No argument".to_string(),
                                });
                            }
                        } else if let Some(arg) = margs_it.next() {
                            return Err(InvalidModeParam {
                                target: target.to_string(),
                                modechar: c,
                                param: arg.to_string(),
                                description: "Unexpected argument".to_string(),
                            });
                        }
                    }
                    'k' => {
                        if mode_set {
                            if margs_it.next().is_none() {
                                return Err(InvalidModeParam {
                                    target: target.to_string(),
                                    modechar: c,
                                    param: "".to_string(),
                                    description: "No argument".to_string(),
                                });
                            }
                        } else if let Some(arg) = margs_it.next() {
                            return Err(InvalidModeParam {
                                target: target.to_string(),
                                modechar: c,
                                param: arg.to_string(),
                                description: "Unexpected argument".to_string(),
                            });
                        }
                    }
                    'i' | 'm' | 't' | 'n' | 's' | 'p' | 'c' | 'T' => {}
                    c => {
                        return Err(UnknownMode(param_idx, c, target.to_string()));
                    }
                }
                Ok(())
            })?;

            param_idx += margs.len() + 1;

            Ok(())
        } else {
            // if empty
            Err(WrongParameter(MODEId, param_idx))
        }
    })
}

impl<'a> Command<'a> {
    fn parse_from_message(message: &Message<'a>) -> Result<Self, CommandError> {
        match message.command {
            "CAP" => {
                if !message.params.is_empty() {
                    let mut param_it = message.params.iter();
                    let subcommand = match *param_it.next().unwrap() {
                        "LS" => CapCommand::LS,
                        "LIST" => CapCommand::LIST,
                        "REQ" => CapCommand::REQ,
                        "END" => CapCommand::END,
                        _ => {
                            return Err(UnknownSubcommand(CAPId, message.params[0].to_string()))
                        }
                    };

                    let (caps, version) = if subcommand == CapCommand::REQ {
                        (
                            param_it
                                .next()
                                .map(|x| x.split_ascii_whitespace().collect::<Vec<_>>()),
                            None,
                        )
                    } else if subcommand == CapCommand::LS {
                        let v = if let Some(s) = param_it.next() {
                            if let Ok(value) = s.parse() {
                                Some(value)
                            } else {
                                return Err(WrongParameter(CAPId, 1));
                            }
                        } else {
                            None
                        };
                        (None, v)
                    } else {
                        (None, None)
                    };

                    Ok(CAP {
                        subcommand,
                        caps,
                        version,
                    })
                } else {
                    Err(NeedMoreParams(CAPId))
                }
            }
            "PASS" => {
                if !message.params.is_empty() {
                    Ok(PASS {
                        password: message.params[0],
                    })
                } else {
                    Err(NeedMoreParams(PASSId))
                }
            }
            "NICK" => {
                if !message.params.is_empty() {
                    Ok(NICK {
                        nickname: message.params[0],
                    })
                } else {
                    Err(NeedMoreParams(NICKId))
                }
            }
            "USER" => {
                if message.params.len() >= 4 {
                    Ok(USER {
                        username: message.params[0],
                        hostname: message.params[1],
                        servername: message.params[2],
                        realname: message.params[3],
                    })
                } else {
                    Err(NeedMoreParams(USERId))
                }
            }
            "SERVER" => {
                if !message.params.is_empty() {
                    Ok(SERVER {
                        name: message.params[0],
                    })
                } else {
                    Err(NeedMoreParams(SERVERId))
                }
            }
            "SERVICE" => {
                if !message.params.is_empty() {
                    Ok(SERVICE {
                        nickname: message.params[0],
                    })
                } else {
                    Err(NeedMoreParams(SERVICEId))
                }
            }
            "PING" => {
                if !message.params.is_empty() {
                    Ok(PING {
                        token: message.params[0],
                    })
                } else {
                    Err(NeedMoreParams(PINGId))
                }
            }
            "PONG" => {
                if !message.params.is_empty() {
                    Ok(PONG {
                        token: message.params[0],
                    })
                } else {
                    Err(NeedMoreParams(PONGId))
                }
            }
            "OPER" => {
                if message.params.len() >= 2 {
                    Ok(OPER {
                        name: message.params[0],
                        password: message.params[1],
                    })
                } else {
                    Err(NeedMoreParams(OPERId))
                }
            }
            "QUIT" => Ok(QUIT {
                reason: message.params.first().copied(),
            }),
            "ERROR" => {
                if !message.params.is_empty() {
                    Ok(ERROR {
                        message: message.params[0],
                    })
                } else {
                    Err(NeedMoreParams(ERRORId))
                }
            }
            "JOIN" => {
                if !message.params.is_empty() {
                    let mut param_it = message.params.iter();
                    let channels = param_it.next().unwrap().split(',').collect::<Vec<_>>();
                    let keys_opt = param_it.next().map(|x| x.split(',').collect::<Vec<_>>());
                    if let Some(ref keys) = keys_opt {
                        if keys.len() != channels.len() {
                            return Err(ParameterDoesntMatch(JOINId, 1));
                        }
                    }
                    Ok(JOIN {
                        channels,
                        keys: keys_opt,
                    })
                } else {
                    Err(NeedMoreParams(JOINId))
                }
            }
            "PART" => {
                if !message.params.is_empty() {
                    let mut param_it = message.params.iter();
                    let channels = param_it.next().unwrap().split(',').collect::<Vec<_>>();
                    let reason = param_it.next().copied();
                    Ok(PART { channels, reason })
                } else {
                    Err(NeedMoreParams(PARTId))
                }
            }
            "TOPIC" => {
                if !message.params.is_empty() {
                    let mut param_it = message.params.iter();
                    let channel = param_it.next().unwrap();
                    let topic = param_it.next().copied();
                    Ok(TOPIC { channel, topic })
                } else {
                    Err(NeedMoreParams(TOPICId))
                }
            }
            "NAMES" => {
                if !message.params.is_empty() {
                    Ok(NAMES {
                        channels: message.params[0].split(',').collect::<Vec<_>>(),
                    })
                } else {
                    Ok(NAMES { channels: vec![] })
                }
            }
            "LIST" => {
                if !message.params.is_empty() {
                    let mut param_it = message.params.iter();
                    let channels = param_it.next().unwrap().split(',').collect::<Vec<_>>();
                    let server = param_it.next().copied();
                    Ok(LIST { channels, server })
                } else {
                    Ok(LIST {
                        channels: vec![],
                        server: None,
                    })
                }
            }
            "INVITE" => {
                if message.params.len() >= 2 {
                    Ok(INVITE {
                        nickname: message.params[0],
                        channel: message.params[1],
                    })
                } else {
                    Err(NeedMoreParams(INVITEId))
                }
            }
            "KICK" => {
                if message.params.len() >= 2 {
                    let mut param_it = message.params.iter();
                    let channel = param_it.next().unwrap();
                    let user = param_it.next().unwrap();
                    let comment = param_it.next().copied();
                    Ok(KICK {
                        channel,
                        user,
                        comment,
                    })
                } else {
                    Err(NeedMoreParams(KICKId))
                }
            }
            "KNOCK" => {
                if !message.params.is_empty() {
                    let mut param_it = message.params.iter();
                    let channel = param_it.next().unwrap();
                    let knock_msg = param_it.next().copied();
                    Ok(KNOCK {
                        channel,
                        message: knock_msg,
                    })
                } else {
                    Err(NeedMoreParams(KNOCKId))
                }
            }
            "MOTD" => Ok(MOTD {
                target: message.params.first().copied(),
            }),
            "VERSION" => Ok(VERSION {
                target: message.params.first().copied(),
            }),
            "ADMIN" => Ok(ADMIN {
                target: message.params.first().copied(),
            }),
            "CONNECT" => {
                if !message.params.is_empty() {
                    let mut param_it = message.params.iter();
                    let target_server = param_it.next().unwrap();
                    let port = param_it.next().map(|x| x.parse()).transpose();
                    let remote_server = param_it.next().copied();
                    match port {
                        Err(_) => Err(WrongParameter(CONNECTId, 1)),
                        Ok(p) => Ok(CONNECT {
                            target_server,
                            port: p,
                            remote_server,
                        }),
                    }
                } else {
                    Err(NeedMoreParams(CONNECTId))
                }
            }
            "LUSERS" => Ok(LUSERS {}),
            "TIME" => Ok(TIME {
                server: message.params.first().copied(),
            }),
            "STATS" => {
                if !message.params.is_empty() {
                    let mut param_it = message.params.iter();
                    let query_str = param_it.next().unwrap();
                    let server = param_it.next().copied();

                    if query_str.len() == 1 {
                        Ok(STATS {
                            query: query_str.chars().next().unwrap(),
                            server,
                        })
                    } else {
                        Err(WrongParameter(STATSId, 0))
                    }
                } else {
                    Err(NeedMoreParams(STATSId))
                }
            }
            "LINKS" => {
                if message.params.len() == 2 {
                    Ok(LINKS {
                        remote_server: Some(message.params[0]),
                        server_mask: Some(message.params[1]),
                    })
                } else if message.params.len() == 1 {
                    Ok(LINKS {
                        remote_server: None,
                        server_mask: Some(message.params[0]),
                    })
                } else {
                    Ok(LINKS {
                        remote_server: None,
                        server_mask: None,
                    })
                }
            }
            "TRACE" => Ok(TRACE {
                target: message.params.first().copied(),
            }),
            "INFO" => Ok(INFO {}),
            "MODE" => {
                if !message.params.is_empty() {
                    let mut modes = vec![];
                    let mut param_it = message.params.iter();
                    let target = param_it.next().unwrap();
                    if let Some(s) = param_it.next() {
                        if s.starts_with('+') || s.starts_with('-') {
                            let mut modestring = *s;
                            let mut mode_args = vec![];
                            for s in param_it {
                                if s.starts_with('+') || s.starts_with('-') {
                                    modes.push((modestring, mode_args));
                                    modestring = *s;
                                    mode_args = vec![];
                                } else {
                                    mode_args.push(*s);
                                }
                            }
                            modes.push((modestring, mode_args));
                        } else {
                            return Err(WrongParameter(MODEId, 1));
                        }
                    }
                    Ok(MODE { target, modes })
                } else {
                    Err(NeedMoreParams(MODEId))
                }
            }
            "PRIVMSG" => {
                if message.params.len() >= 2 {
                    Ok(PRIVMSG {
                        targets: message.params[0].split(',').collect::<Vec<_>>(),
                        text: message.params[1],
                    })
                } else {
                    Err(NeedMoreParams(PRIVMSGId))
                }
            }
            "NOTICE" => {
                if message.params.len() >= 2 {
                    Ok(NOTICE {
                        targets: message.params[0].split(',').collect::<Vec<_>>(),
                        text: message.params[1],
                    })
                } else {
                    Err(NeedMoreParams(NOTICEId))
                }
            }
            "SERVLIST" => {
                let mut param_it = message.params.iter();
                Ok(SERVLIST {
                    mask: param_it.next().copied(),
                    servtype: param_it.next().copied(),
                })
            }
            "SQUERY" => {
                if message.params.len() >= 2 {
                    Ok(SQUERY {
                        servicename: message.params[0],
                        text: message.params[1],
                    })
                } else {
                    Err(NeedMoreParams(SQUERYId))
                }
            }
            "WHO" => {
                if !message.params.is_empty() {
                    Ok(WHO {
                        mask: message.params[0],
                    })
                } else {
                    Err(NeedMoreParams(WHOId))
                }
            }
            "WHOIS" => {
                if !message.params.is_empty() {
                    if message.params.len() >= 2 {
                        Ok(WHOIS {
                            target: Some(message.params[0]),
                            nickmasks: message.params[1].split(',').collect::<Vec<_>>(),
                        })
                    } else {
                        Ok(WHOIS {
                            target: None,
                            nickmasks: message.params[0].split(',').collect::<Vec<_>>(),
                        })
                    }
                } else {
                    Err(NeedMoreParams(WHOISId))
                }
            }
            "WHOWAS" => {
                if !message.params.is_empty() {
                    let mut param_it = message.params.iter();
                    let nickname = param_it.next().unwrap();
                    let count = param_it.next().map(|x| x.parse()).transpose();
                    let server = param_it.next().copied();
                    match count {
                        Err(_) => Err(WrongParameter(WHOWASId, 1)),
                        Ok(c) => Ok(WHOWAS {
                            nickname,
                            count: c,
                            server,
                        }),
                    }
                } else {
                    Err(NeedMoreParams(WHOWASId))
                }
            }
            "KILL" => {
                if message.params.len() >= 2 {
                    Ok(KILL {
                        nickname: message.params[0],
                        comment: message.params[1],
                    })
                } else {
                    Err(NeedMoreParams(KILLId))
                }
            }
            "DIE" => Ok(DIE {}),
            "REHASH" => Ok(REHASH {}),
            "RESTART" => Ok(RESTART {}),
            "SQUIT" => {
                if message.params.len() >= 2 {
                    Ok(SQUIT {
                        server: message.params[0],
                        comment: message.params[1],
                    })
                } else {
                    Err(NeedMoreParams(SQUITId))
                }
            }
            "AWAY" => Ok(AWAY {
                text: message.params.first().copied(),
            }),
            "ISON" => {
                if !message.params.is_empty() {
                    Ok(ISON {
                        nicknames: message.params.clone(),
                    })
                } else {
                    Err(NeedMoreParams(ISONId))
                }
            }
            "USERHOST" => {
                if !message.params.is_empty() {
                    Ok(USERHOST {
                        nicknames: message.params.clone(),
                    })
                } else {
                    Err(NeedMoreParams(USERHOSTId))
                }
            }
            "WALLOPS" => {
                if !message.params.is_empty() {
                    Ok(WALLOPS {
                        text: message.params[0],
                    })
                } else {
                    Err(NeedMoreParams(WALLOPSId))
                }
            }
            "SUMMON" => {
                if !message.params.is_empty() {
                    Ok(SUMMON {
                        user: message.params[0],
                    })
                } else {
                    Err(NeedMoreParams(SUMMONId))
                }
            }
            "SILENCE" => Ok(SILENCE {
                mask: message.params.first().copied(),
            }),
            "LANGUAGE" => {
                if !message.params.is_empty() {
                    Ok(LANGUAGE {
                        langs: message.params.clone(),
                    })
                } else {
                    Err(NeedMoreParams(LANGUAGEId))
                }
            }
            s => Err(UnknownCommand(s.to_string())),
        }
    }

    pub(crate) fn from_message(message: &Message<'a>) -> Result<Self, CommandError> {
        match Self::parse_from_message(message) {
            Ok(x) => match x.validate() {
                Ok(()) => Ok(x),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    fn validate(&self) -> Result<(), CommandError> {
        match self {
            CAP { caps, version, .. } => {
                if caps.is_some() {
                    Ok(())
                } else if let Some(v) = version {
                    if *v < 302 {
                        Err(WrongParameter(CAPId, 1))
                    } else {
                        Ok(())
                    }
                } else {
                    Ok(())
                }
            }
            NICK { nickname } => {
                validate_username(nickname).map_err(|_| WrongParameter(NICKId, 0))
            }
            USER { username, .. } => {
                validate_username(username).map_err(|_| WrongParameter(USERId, 0))
            }
            SERVER { name } => validate_server(name, WrongParameter(SERVERId, 0)),
            SERVICE { nickname } => {
                validate_username(nickname).map_err(|_| WrongParameter(SERVICEId, 0))
            }
            OPER { name, .. } => validate_username(name).map_err(|_| WrongParameter(OPERId, 0)),
            JOIN { channels, .. } => channels
                .iter()
                .try_for_each(|ch| validate_channel(ch))
                .map_err(|_| WrongParameter(JOINId, 0)),
            PART { channels, .. } => channels
                .iter()
                .try_for_each(|ch| validate_channel(ch))
                .map_err(|_| WrongParameter(PARTId, 0)),
            TOPIC { channel, .. } => {
                validate_channel(channel).map_err(|_| WrongParameter(TOPICId, 0))
            }
            NAMES { channels } => channels
                .iter()
                .try_for_each(|ch| validate_channel(ch))
                .map_err(|_| WrongParameter(NAMESId, 0)),
            LIST { channels, server } => {
                channels
                    .iter()
                    .try_for_each(|ch| validate_channel(ch))
                    .map_err(|_| WrongParameter(LISTId, 0))?;
                if let Some(srv) = server {
                    validate_server(srv, WrongParameter(LISTId, 1))?;
                }
                Ok(())
            }
            INVITE { nickname, channel } => {
                validate_username(nickname).map_err(|_| WrongParameter(INVITEId, 0))?;
                validate_channel(channel).map_err(|_| WrongParameter(INVITEId, 1))
            }
            KICK { channel, user, .. } => {
                validate_channel(channel).map_err(|_| WrongParameter(KICKId, 0))?;
                validate_username(user).map_err(|_| WrongParameter(KICKId, 1))
            }
            KNOCK { channel, .. } => {
                validate_channel(channel).map_err(|_| WrongParameter(KNOCKId, 0))
            }
            MOTD { target } => {
                if let Some(t) = target {
                    validate_server_mask(t, WrongParameter(MOTDId, 0))?;
                }
                Ok(())
            }
            VERSION { target } => {
                if let Some(t) = target {
                    validate_server_mask(t, WrongParameter(VERSIONId, 0))?;
                }
                Ok(())
            }
            ADMIN { target } => {
                if let Some(t) = target {
                    validate_server_mask(t, WrongParameter(ADMINId, 0))?;
                }
                Ok(())
            }
            CONNECT {
                target_server,
                remote_server,
                ..
            } => {
                validate_server(target_server, WrongParameter(CONNECTId, 0))?;
                if let Some(s) = remote_server {
                    validate_server(s, WrongParameter(CONNECTId, 1))?;
                }
                Ok(())
            }
            TIME { server } => {
                if let Some(s) = server {
                    validate_server(s, WrongParameter(TIMEId, 0))?;
                }
                Ok(())
            }
            STATS { query, server } => {
                match query {
                    'c' | 'h' | 'i' | 'k' | 'l' | 'm' | 'o' | 'u' | 'y' => {
                        if let Some(s) = server {
                            validate_server(s, WrongParameter(STATSId, 1))?;
                        }
                    }
                    _ => return Err(WrongParameter(STATSId, 0)),
                };
                Ok(())
            }
            LINKS {
                remote_server,
                server_mask,
            } => {
                if let Some(s) = remote_server {
                    validate_server(s, WrongParameter(LINKSId, 0))?;
                    if let Some(sm) = server_mask {
                        validate_server_mask(sm, WrongParameter(LINKSId, 1))?;
                    }
                } else if let Some(sm) = server_mask {
                    validate_server_mask(sm, WrongParameter(LINKSId, 0))?;
                }
                Ok(())
            }
            TRACE { target } => {
                if let Some(t) = target {
                    validate_server_mask(t, WrongParameter(TRACEId, 0))?;
                }
                Ok(())
            }
            MODE { target, modes } => {
                if validate_channel(target).is_ok() {
                    validate_channelmodes(target, modes)
                } else if validate_username(target).is_ok() {
                    validate_usermodes(modes)
                } else {
                    Err(WrongParameter(MODEId, 0))
                }
            }
            PRIVMSG { targets, .. } => targets
                .iter()
                .try_for_each(|n| {
                    validate_username(n)
                        .map_err(|_| WrongParameter(PRIVMSGId, 0))
                        .or_else(|e| validate_prefixed_channel(n, e))
                })
                .map_err(|_| WrongParameter(PRIVMSGId, 0)),
            NOTICE { targets, .. } => targets
                .iter()
                .try_for_each(|n| {
                    validate_username(n)
                        .map_err(|_| WrongParameter(NOTICEId, 0))
                        .or_else(|e| validate_prefixed_channel(n, e))
                })
                .map_err(|_| WrongParameter(NOTICEId, 0)),
            SQUERY { servicename, .. } => {
                validate_username(servicename).map_err(|_| WrongParameter(SQUERYId, 0))
            }
            WHOIS { target, nickmasks } => {
                let next_param_idx = if let Some(t) = target {
                    validate_server(t, WrongParameter(WHOISId, 0))?;
                    1
                } else {
                    0
                };
                nickmasks
                    .iter()
                    .try_for_each(|n| validate_username(n))
                    .map_err(|_| WrongParameter(WHOISId, next_param_idx))
            }
            WHOWAS {
                nickname, server, ..
            } => {
                validate_username(nickname).map_err(|_| WrongParameter(WHOWASId, 0))?;
                if let Some(s) = server {
                    validate_server(s, WrongParameter(WHOWASId, 2))?;
                }
                Ok(())
            }
            KILL { nickname, .. } => {
                validate_username(nickname).map_err(|_| WrongParameter(KILLId, 0))
            }
            SQUIT { server, .. } => {
                validate_server(server, WrongParameter(SQUITId, 0))?;
                Ok(())
            }
            ISON { nicknames } => nicknames.iter().enumerate().try_for_each(|(i, n)| {
                validate_username(n).map_err(|_| WrongParameter(ISONId, i))
            }),
            USERHOST { nicknames } => nicknames.iter().enumerate().try_for_each(|(i, n)| {
                validate_username(n).map_err(|_| WrongParameter(USERHOSTId, i))
            }),
            _ => Ok(()),
        }
    }

    // commands accepted from a connection that has not registered yet.
    pub(crate) fn allowed_before_registration(&self) -> bool {
        matches!(
            self,
            CAP { .. } | PASS { .. } | NICK { .. } | USER { .. } | QUIT { .. }
        )
    }

    // gated in the dispatcher with 481 before the handler runs.
    pub(crate) fn oper_only(&self) -> bool {
        matches!(
            self,
            CONNECT { .. }
                | KILL { .. }
                | DIE {}
                | REHASH {}
                | RESTART {}
                | SQUIT { .. }
                | WALLOPS { .. }
        )
    }

    pub(crate) fn dialect_gate(&self) -> DialectGate {
        match self {
            SERVLIST { .. } | SQUERY { .. } => DialectGate::Rfc2810Up,
            CAP { .. } | KNOCK { .. } | LANGUAGE { .. } | SILENCE { .. } => {
                DialectGate::ModernOnly
            }
            _ => DialectGate::All,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_message_from_shared_str() {
        assert_eq!(
            Ok(Message {
                source: None,
                command: "QUIT",
                params: vec![]
            }),
            Message::from_shared_str("QUIT").map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(Message {
                source: None,
                command: "QUIT",
                params: vec![]
            }),
            Message::from_shared_str("   QUIT").map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(Message {
                source: Some("source"),
                command: "QUIT",
                params: vec![]
            }),
            Message::from_shared_str(":source QUIT").map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(Message {
                source: None,
                command: "USER",
                params: vec!["guest", "0", "*", "Ronnie Reagan"]
            }),
            Message::from_shared_str("USER guest 0 * :Ronnie Reagan").map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(Message {
                source: None,
                command: "USER",
                params: vec!["guest", "0", "*", "Benny"]
            }),
            Message::from_shared_str("USER guest 0 * Benny").map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(Message {
                source: None,
                command: "PRIVMSG",
                params: vec!["bobby", ":-). Hello guy!"]
            }),
            Message::from_shared_str("PRIVMSG bobby ::-). Hello guy!").map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(Message {
                source: Some("mati!mat@gg.com"),
                command: "QUIT",
                params: vec![]
            }),
            Message::from_shared_str(":mati!mat@gg.com QUIT").map_err(|e| e.to_string())
        );
        assert_eq!(
            Err("Wrong source syntax".to_string()),
            Message::from_shared_str(":mati@mat!gg.com QUIT").map_err(|e| e.to_string())
        );
        assert_eq!(
            Err("Message is empty".to_string()),
            Message::from_shared_str("  ").map_err(|e| e.to_string())
        );
    }

    #[test]
    fn test_message_is_numeric() {
        assert!(Message::from_shared_str(":srv 001 alice :Welcome to IRC")
            .unwrap()
            .is_numeric());
        assert!(!Message::from_shared_str("NICK alice").unwrap().is_numeric());
        assert!(!Message::from_shared_str("0001 x").unwrap().is_numeric());
    }

    #[test]
    fn test_message_numeric_parse() {
        let msg = Message::from_shared_str(":srv 001 alice :Welcome to IRC").unwrap();
        assert_eq!(Some("srv"), msg.source);
        assert_eq!("001", msg.command);
        assert_eq!(vec!["alice", "Welcome to IRC"], msg.params);
    }

    #[test]
    fn test_message_to_string_with_source() {
        let msg = Message::from_shared_str("PRIVMSG #doggy :Hello, guys!").unwrap();
        assert_eq!(
            ":mati!~mat@gg.com PRIVMSG #doggy :Hello, guys!",
            msg.to_string_with_source("mati!~mat@gg.com")
        );
        let msg = Message::from_shared_str("JOIN #doggy").unwrap();
        assert_eq!(
            ":mati!~mat@gg.com JOIN #doggy",
            msg.to_string_with_source("mati!~mat@gg.com")
        );
        let msg = Message::from_shared_str("TOPIC #doggy :").unwrap();
        assert_eq!(
            ":mati!~mat@gg.com TOPIC #doggy :",
            msg.to_string_with_source("mati!~mat@gg.com")
        );
    }

    #[test]
    fn test_command_from_message_conn() {
        assert_eq!(
            Ok(CAP {
                subcommand: CapCommand::LS,
                caps: None,
                version: None
            }),
            Command::from_message(&Message {
                source: None,
                command: "CAP",
                params: vec!["LS"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(CAP {
                subcommand: CapCommand::LS,
                caps: None,
                version: Some(302)
            }),
            Command::from_message(&Message {
                source: None,
                command: "CAP",
                params: vec!["LS", "302"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Err("Wrong parameter 1 in command 'CAP'".to_string()),
            Command::from_message(&Message {
                source: None,
                command: "CAP",
                params: vec!["LS", "301"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(CAP {
                subcommand: CapCommand::REQ,
                version: None,
                caps: Some(vec!["multi-prefix", "tls"])
            }),
            Command::from_message(&Message {
                source: None,
                command: "CAP",
                params: vec!["REQ", "multi-prefix tls"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Err("Unknown subcommand 'LSS' in command 'CAP'".to_string()),
            Command::from_message(&Message {
                source: None,
                command: "CAP",
                params: vec!["LSS"]
            })
            .map_err(|e| e.to_string())
        );

        assert_eq!(
            Ok(PASS { password: "secret" }),
            Command::from_message(&Message {
                source: None,
                command: "PASS",
                params: vec!["secret"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Err("Command 'PASS' needs more parameters".to_string()),
            Command::from_message(&Message {
                source: None,
                command: "PASS",
                params: vec![]
            })
            .map_err(|e| e.to_string())
        );

        assert_eq!(
            Ok(NICK { nickname: "lucky" }),
            Command::from_message(&Message {
                source: None,
                command: "NICK",
                params: vec!["lucky"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Err("Wrong parameter 0 in command 'NICK'".to_string()),
            Command::from_message(&Message {
                source: None,
                command: "NICK",
                params: vec!["luc:ky"]
            })
            .map_err(|e| e.to_string())
        );

        assert_eq!(
            Ok(USER {
                username: "chris",
                hostname: "0",
                servername: "*",
                realname: "Chris Wood"
            }),
            Command::from_message(&Message {
                source: None,
                command: "USER",
                params: vec!["chris", "0", "*", "Chris Wood"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Err("Command 'USER' needs more parameters".to_string()),
            Command::from_message(&Message {
                source: None,
                command: "USER",
                params: vec!["chris", "0", "*"]
            })
            .map_err(|e| e.to_string())
        );

        assert_eq!(
            Ok(PING { token: "xxx" }),
            Command::from_message(&Message {
                source: None,
                command: "PING",
                params: vec!["xxx"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(QUIT { reason: None }),
            Command::from_message(&Message {
                source: None,
                command: "QUIT",
                params: vec![]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(QUIT {
                reason: Some("Bye")
            }),
            Command::from_message(&Message {
                source: None,
                command: "QUIT",
                params: vec!["Bye"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(OPER {
                name: "guru",
                password: "mythebestday"
            }),
            Command::from_message(&Message {
                source: None,
                command: "OPER",
                params: vec!["guru", "mythebestday"]
            })
            .map_err(|e| e.to_string())
        );
    }

    #[test]
    fn test_command_from_message_channel() {
        assert_eq!(
            Ok(JOIN {
                channels: vec!["#cats", "#software"],
                keys: None
            }),
            Command::from_message(&Message {
                source: None,
                command: "JOIN",
                params: vec!["#cats,#software"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(JOIN {
                channels: vec!["#cats", "#software"],
                keys: Some(vec!["mycat", "wesnoth"])
            }),
            Command::from_message(&Message {
                source: None,
                command: "JOIN",
                params: vec!["#cats,#software", "mycat,wesnoth"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Err("Wrong parameter 0 in command 'JOIN'".to_string()),
            Command::from_message(&Message {
                source: None,
                command: "JOIN",
                params: vec!["#cats,&fruits"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Err("Parameter 1 doesn't match for command 'JOIN'".to_string()),
            Command::from_message(&Message {
                source: None,
                command: "JOIN",
                params: vec!["#cats,#software,#countries", "mycat,wesnoth"]
            })
            .map_err(|e| e.to_string())
        );

        assert_eq!(
            Ok(PART {
                channels: vec!["#dogs", "#hardware"],
                reason: Some("I don't like these channels")
            }),
            Command::from_message(&Message {
                source: None,
                command: "PART",
                params: vec!["#dogs,#hardware", "I don't like these channels"]
            })
            .map_err(|e| e.to_string())
        );

        assert_eq!(
            Ok(TOPIC {
                channel: "#gizmo",
                topic: Some("Some creatures")
            }),
            Command::from_message(&Message {
                source: None,
                command: "TOPIC",
                params: vec!["#gizmo", "Some creatures"]
            })
            .map_err(|e| e.to_string())
        );

        assert_eq!(
            Ok(NAMES { channels: vec![] }),
            Command::from_message(&Message {
                source: None,
                command: "NAMES",
                params: vec![]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(LIST {
                channels: vec![],
                server: None
            }),
            Command::from_message(&Message {
                source: None,
                command: "LIST",
                params: vec![]
            })
            .map_err(|e| e.to_string())
        );

        assert_eq!(
            Ok(INVITE {
                nickname: "greg",
                channel: "#plants"
            }),
            Command::from_message(&Message {
                source: None,
                command: "INVITE",
                params: vec!["greg", "#plants"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(KICK {
                channel: "#toolkits",
                user: "mickey",
                comment: Some("Mickey is not polite")
            }),
            Command::from_message(&Message {
                source: None,
                command: "KICK",
                params: vec!["#toolkits", "mickey", "Mickey is not polite"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(KNOCK {
                channel: "#closed",
                message: None
            }),
            Command::from_message(&Message {
                source: None,
                command: "KNOCK",
                params: vec!["#closed"]
            })
            .map_err(|e| e.to_string())
        );
    }

    #[test]
    fn test_command_from_message_mode() {
        assert_eq!(
            Ok(MODE {
                target: "#bichannel",
                modes: vec![("+ntk", vec!["blabla"]), ("-m", vec![])]
            }),
            Command::from_message(&Message {
                source: None,
                command: "MODE",
                params: vec!["#bichannel", "+ntk", "blabla", "-m"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(MODE {
                target: "#bichannel",
                modes: vec![]
            }),
            Command::from_message(&Message {
                source: None,
                command: "MODE",
                params: vec!["#bichannel"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(MODE {
                target: "andy",
                modes: vec![("+iw", vec![])]
            }),
            Command::from_message(&Message {
                source: None,
                command: "MODE",
                params: vec!["andy", "+iw"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Err("Unknown umode flag in parameter 1".to_string()),
            Command::from_message(&Message {
                source: None,
                command: "MODE",
                params: vec!["andy", "+ix"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Err("Unknown mode x in parameter 1".to_string()),
            Command::from_message(&Message {
                source: None,
                command: "MODE",
                params: vec!["#chan", "+x"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Err("Invalid mode parameter: #chan l  No argument".to_string()),
            Command::from_message(&Message {
                source: None,
                command: "MODE",
                params: vec!["#chan", "+l"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Err("Invalid mode parameter: #chan l 0 Client limit must be positive".to_string()),
            Command::from_message(&Message {
                source: None,
                command: "MODE",
                params: vec!["#chan", "+l", "0"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Err("Invalid mode parameter: #chan o  No argument".to_string()),
            Command::from_message(&Message {
                source: None,
                command: "MODE",
                params: vec!["#chan", "+o"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(MODE {
                target: "#chan",
                modes: vec![("+b", vec![])]
            }),
            Command::from_message(&Message {
                source: None,
                command: "MODE",
                params: vec!["#chan", "+b"]
            })
            .map_err(|e| e.to_string())
        );
    }

    #[test]
    fn test_command_from_message_queries() {
        assert_eq!(
            Ok(MOTD { target: None }),
            Command::from_message(&Message {
                source: None,
                command: "MOTD",
                params: vec![]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(STATS {
                query: 'u',
                server: None
            }),
            Command::from_message(&Message {
                source: None,
                command: "STATS",
                params: vec!["u"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Err("Wrong parameter 0 in command 'STATS'".to_string()),
            Command::from_message(&Message {
                source: None,
                command: "STATS",
                params: vec!["z"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(WHOIS {
                target: None,
                nickmasks: vec!["alice", "eliz"]
            }),
            Command::from_message(&Message {
                source: None,
                command: "WHOIS",
                params: vec!["alice,eliz"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(WHOWAS {
                nickname: "mat",
                count: Some(10),
                server: None
            }),
            Command::from_message(&Message {
                source: None,
                command: "WHOWAS",
                params: vec!["mat", "10"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(ISON {
                nicknames: vec!["bobby", "jimmy"]
            }),
            Command::from_message(&Message {
                source: None,
                command: "ISON",
                params: vec!["bobby", "jimmy"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(SUMMON { user: "jonathan" }),
            Command::from_message(&Message {
                source: None,
                command: "SUMMON",
                params: vec!["jonathan"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(SILENCE { mask: None }),
            Command::from_message(&Message {
                source: None,
                command: "SILENCE",
                params: vec![]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(SILENCE {
                mask: Some("+bad!*@*")
            }),
            Command::from_message(&Message {
                source: None,
                command: "SILENCE",
                params: vec!["+bad!*@*"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(SERVLIST {
                mask: None,
                servtype: None
            }),
            Command::from_message(&Message {
                source: None,
                command: "SERVLIST",
                params: vec![]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Ok(SQUERY {
                servicename: "irchelp",
                text: "HELP privmsg"
            }),
            Command::from_message(&Message {
                source: None,
                command: "SQUERY",
                params: vec!["irchelp", "HELP privmsg"]
            })
            .map_err(|e| e.to_string())
        );
        assert_eq!(
            Err("Unknown command 'BLABLA'".to_string()),
            Command::from_message(&Message {
                source: None,
                command: "BLABLA",
                params: vec![]
            })
            .map_err(|e| e.to_string())
        );
    }

    #[test]
    fn test_command_gates() {
        let die = Command::from_message(&Message {
            source: None,
            command: "DIE",
            params: vec![],
        })
        .unwrap();
        assert!(die.oper_only());
        assert_eq!(DialectGate::All, die.dialect_gate());
        assert!(!die.allowed_before_registration());

        let cap = Command::from_message(&Message {
            source: None,
            command: "CAP",
            params: vec!["LS"],
        })
        .unwrap();
        assert!(!cap.oper_only());
        assert_eq!(DialectGate::ModernOnly, cap.dialect_gate());
        assert!(cap.allowed_before_registration());

        let servlist = Command::from_message(&Message {
            source: None,
            command: "SERVLIST",
            params: vec![],
        })
        .unwrap();
        assert_eq!(DialectGate::Rfc2810Up, servlist.dialect_gate());

        assert!(DialectGate::All.enabled(Dialect::Rfc1459));
        assert!(!DialectGate::Rfc2810Up.enabled(Dialect::Rfc1459));
        assert!(DialectGate::Rfc2810Up.enabled(Dialect::Rfc2810));
        assert!(!DialectGate::ModernOnly.enabled(Dialect::Rfc2810));
        assert!(DialectGate::ModernOnly.enabled(Dialect::Modern));
    }
}
