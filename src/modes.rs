// modes.rs - dialect-driven mode and channel-type registries
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

use std::collections::HashMap;

use crate::config::Dialect;

// the least channel rank that may change a mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SetterRank {
    Op,
    HalfOp,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct ChannelModeDef {
    pub(crate) letter: char,
    pub(crate) param_on_set: bool,
    pub(crate) param_on_unset: bool,
    pub(crate) is_list: bool,
    pub(crate) setter_rank: SetterRank,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct RankModeDef {
    pub(crate) letter: char,
    pub(crate) prefix: char,
}

pub(crate) struct ModeRegistry {
    channel_modes: HashMap<char, ChannelModeDef>,
    // ordered from highest to lowest precedence.
    rank_modes: Vec<RankModeDef>,
    user_modes: Vec<char>,
}

fn flag_mode(letter: char) -> ChannelModeDef {
    ChannelModeDef {
        letter,
        param_on_set: false,
        param_on_unset: false,
        is_list: false,
        setter_rank: SetterRank::Op,
    }
}

fn list_mode(letter: char, setter_rank: SetterRank) -> ChannelModeDef {
    ChannelModeDef {
        letter,
        param_on_set: true,
        param_on_unset: true,
        is_list: true,
        setter_rank,
    }
}

impl ModeRegistry {
    pub(crate) fn new_for_dialect(dialect: Dialect) -> ModeRegistry {
        let mut channel_modes = HashMap::new();
        // the common catalog
        for def in [
            list_mode(
                'b',
                if dialect == Dialect::Modern {
                    SetterRank::HalfOp
                } else {
                    SetterRank::Op
                },
            ),
            flag_mode('i'),
            ChannelModeDef {
                letter: 'k',
                param_on_set: true,
                param_on_unset: false,
                is_list: false,
                setter_rank: SetterRank::Op,
            },
            ChannelModeDef {
                letter: 'l',
                param_on_set: true,
                param_on_unset: false,
                is_list: false,
                setter_rank: SetterRank::Op,
            },
            flag_mode('m'),
            flag_mode('n'),
            flag_mode('s'),
            flag_mode('p'),
            flag_mode('t'),
        ] {
            channel_modes.insert(def.letter, def);
        }

        if dialect != Dialect::Rfc1459 {
            let e_rank = if dialect == Dialect::Modern {
                SetterRank::HalfOp
            } else {
                SetterRank::Op
            };
            channel_modes.insert('e', list_mode('e', e_rank));
            channel_modes.insert('I', list_mode('I', SetterRank::Op));
        }
        if dialect == Dialect::Modern {
            channel_modes.insert('c', flag_mode('c'));
            channel_modes.insert('T', flag_mode('T'));
        }

        let mut rank_modes = vec![RankModeDef {
            letter: 'o',
            prefix: '@',
        }];
        if dialect == Dialect::Modern {
            rank_modes.push(RankModeDef {
                letter: 'h',
                prefix: '%',
            });
        }
        rank_modes.push(RankModeDef {
            letter: 'v',
            prefix: '+',
        });

        ModeRegistry {
            channel_modes,
            rank_modes,
            user_modes: vec!['O', 'i', 'o', 'r', 'w'],
        }
    }

    pub(crate) fn channel_mode(&self, letter: char) -> Option<&ChannelModeDef> {
        self.channel_modes.get(&letter)
    }

    pub(crate) fn rank_mode(&self, letter: char) -> Option<&RankModeDef> {
        self.rank_modes.iter().find(|r| r.letter == letter)
    }

    pub(crate) fn has_user_mode(&self, letter: char) -> bool {
        self.user_modes.contains(&letter)
    }

    // sorted channel mode letters including ranks, for 004.
    pub(crate) fn chanmodes_string(&self) -> String {
        let mut letters: Vec<char> = self.channel_modes.keys().copied().collect();
        letters.extend(self.rank_modes.iter().map(|r| r.letter));
        letters.sort();
        letters.into_iter().collect()
    }

    pub(crate) fn usermodes_string(&self) -> String {
        self.user_modes.iter().collect()
    }

    // ISUPPORT PREFIX token, e.g. "(ohv)@%+".
    pub(crate) fn prefix_token(&self) -> String {
        let mut letters = String::new();
        let mut prefixes = String::new();
        for r in &self.rank_modes {
            letters.push(r.letter);
            prefixes.push(r.prefix);
        }
        format!("({}){}", letters, prefixes)
    }

    // ISUPPORT CHANMODES groups: lists, always-arg, set-arg, flags.
    pub(crate) fn chanmodes_token(&self) -> String {
        let mut lists: Vec<char> = vec![];
        let mut both_arg: Vec<char> = vec![];
        let mut set_arg: Vec<char> = vec![];
        let mut flags: Vec<char> = vec![];
        for def in self.channel_modes.values() {
            if def.is_list {
                lists.push(def.letter);
            } else if def.param_on_set && def.param_on_unset {
                both_arg.push(def.letter);
            } else if def.param_on_set {
                set_arg.push(def.letter);
            } else {
                flags.push(def.letter);
            }
        }
        lists.sort();
        both_arg.sort();
        set_arg.sort();
        flags.sort();
        format!(
            "{},{},{},{}",
            lists.iter().collect::<String>(),
            both_arg.iter().collect::<String>(),
            set_arg.iter().collect::<String>(),
            flags.iter().collect::<String>()
        )
    }
}

// channel semantics selected by the name's first character.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct ChannelTypeDef {
    pub(crate) prefix: char,
    pub(crate) name: &'static str,
    pub(crate) supports_modes: bool,
    pub(crate) supports_bans: bool,
    pub(crate) supports_invites: bool,
    pub(crate) cross_server: bool,
}

pub(crate) struct ChannelTypeRegistry {
    types: HashMap<char, ChannelTypeDef>,
}

impl ChannelTypeRegistry {
    pub(crate) fn new() -> ChannelTypeRegistry {
        let mut types = HashMap::new();
        types.insert(
            '#',
            ChannelTypeDef {
                prefix: '#',
                name: "NormalChannel",
                supports_modes: true,
                supports_bans: true,
                supports_invites: true,
                cross_server: true,
            },
        );
        ChannelTypeRegistry { types }
    }

    pub(crate) fn by_prefix(&self, prefix: char) -> Option<&ChannelTypeDef> {
        self.types.get(&prefix)
    }

    pub(crate) fn prefixes(&self) -> String {
        let mut ps: Vec<char> = self.types.keys().copied().collect();
        ps.sort();
        ps.into_iter().collect()
    }

    // channel name: registered prefix, then body without space, comma, BEL or ':'.
    pub(crate) fn is_channel_name(&self, name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(p) if self.types.contains_key(&p) => {
                let body = chars.as_str();
                !body.is_empty()
                    && !body
                        .chars()
                        .any(|c| matches!(c, ' ' | ',' | '\x07' | ':'))
            }
            _ => false,
        }
    }
}
