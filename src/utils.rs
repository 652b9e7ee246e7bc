// utils.rs - codec and validation helpers
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

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};
use bytes::{BufMut, BytesMut};
use std::error::Error;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};
use validator::ValidationError;

use crate::config::Dialect;

// special LinesCodec for IRC - encode with "\r\n".
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub(crate) struct IRCLinesCodec(LinesCodec);

impl IRCLinesCodec {
    pub(crate) fn new() -> IRCLinesCodec {
        IRCLinesCodec(LinesCodec::new())
    }

    pub(crate) fn new_with_max_length(max_length: usize) -> IRCLinesCodec {
        IRCLinesCodec(LinesCodec::new_with_max_length(max_length))
    }
}

impl Encoder<String> for IRCLinesCodec {
    type Error = LinesCodecError;

    fn encode(&mut self, line: String, buf: &mut BytesMut) -> Result<(), Self::Error> {
        let max_length = self.0.max_length();
        // outbound lines are bounded too - truncate at a character boundary
        let out = if max_length != usize::MAX && line.len() + 2 > max_length {
            let mut end = max_length - 2;
            while !line.is_char_boundary(end) {
                end -= 1;
            }
            &line[..end]
        } else {
            &line[..]
        };
        buf.reserve(out.len() + 2);
        buf.put(out.as_bytes());
        // put "\r\n"
        buf.put_u8(b'\r');
        buf.put_u8(b'\n');
        Ok(())
    }
}

impl Decoder for IRCLinesCodec {
    type Item = String;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        self.0.decode(buf)
    }
}

pub(crate) fn validate_username(username: &str) -> Result<(), ValidationError> {
    if !username.is_empty() && username.as_bytes()[0] == b'#' {
        Err(ValidationError::new("Username must not have channel prefix."))
    } else if !username.contains('.') && !username.contains(':') && !username.contains(',') {
        Ok(())
    } else {
        Err(ValidationError::new(
            "Username must not contains '.', ',' or ':'.",
        ))
    }
}

pub(crate) fn validate_channel(channel: &str) -> Result<(), ValidationError> {
    if channel.len() >= 2
        && channel.as_bytes()[0] == b'#'
        && !channel.contains(':')
        && !channel.contains(',')
        && !channel.contains(' ')
        && !channel.contains('\x07')
    {
        Ok(())
    } else {
        Err(ValidationError::new(
            "Channel name must have '#' at start and must not contains \
                ' ', ',', BEL or ':'.",
        ))
    }
}

pub(crate) fn validate_server<E: Error>(s: &str, e: E) -> Result<(), E> {
    if s.contains('.') {
        Ok(())
    } else {
        Err(e)
    }
}

pub(crate) fn validate_server_mask<E: Error>(s: &str, e: E) -> Result<(), E> {
    if s.contains('.') | s.contains('*') {
        Ok(())
    } else {
        Err(e)
    }
}

// channel name optionally preceded by rank prefixes (for PRIVMSG targets).
pub(crate) fn validate_prefixed_channel<E: Error>(channel: &str, e: E) -> Result<(), E> {
    if !channel.is_empty() && !channel.contains(':') && !channel.contains(',') {
        let mut is_channel = false;
        for (i, c) in channel.bytes().enumerate() {
            match c {
                b'@' | b'%' | b'+' => (),
                b'#' => {
                    is_channel = i + 1 < channel.len();
                    break;
                }
                _ => break,
            }
        }
        if is_channel {
            Ok(())
        } else {
            Err(e)
        }
    } else {
        Err(e)
    }
}

// nickname grammar is dialect-gated. first-character rules are left to callers.
pub(crate) fn is_valid_nickname(dialect: Dialect, nick: &str) -> bool {
    if nick.is_empty() {
        return false;
    }
    match dialect {
        Dialect::Modern => !nick.chars().any(|c| {
            matches!(
                c,
                ' ' | ',' | '\x07' | '!' | '@' | '*' | '?' | '+' | '%' | '#'
            )
        }),
        Dialect::Rfc1459 | Dialect::Rfc2810 => nick.bytes().all(|c| {
            matches!(c,
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' |
                b'[' | b']' | b'\\' | b'`' | b'_' | b'^' | b'{' | b'|' | b'}')
        }),
    }
}

// case-fold a nickname or channel name into its index key. under the RFC
// dialects '{}|^' are the lowercase forms of '[]\~'.
pub(crate) fn casefold_name(dialect: Dialect, name: &str) -> String {
    match dialect {
        Dialect::Modern => name.to_ascii_lowercase(),
        Dialect::Rfc1459 | Dialect::Rfc2810 => name
            .chars()
            .map(|c| match c {
                'A'..='Z' => c.to_ascii_lowercase(),
                '[' => '{',
                ']' => '}',
                '\\' => '|',
                '~' => '^',
                _ => c,
            })
            .collect(),
    }
}

// normalize ban-like mask into nick!user@host form.
pub(crate) fn normalize_sourcemask(mask: &str) -> String {
    if mask.contains('!') {
        mask.to_string()
    } else if mask.contains('@') {
        format!("*!{}", mask)
    } else {
        format!("{}!*@*", mask)
    }
}

pub(crate) fn argon2_hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

// verification is slow by design - do not hold it on the runtime threads.
pub(crate) async fn argon2_verify_password_async(
    password: String,
    hash: String,
) -> Result<(), String> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash).map_err(|e| e.to_string())?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| e.to_string())?
}

fn starts_single_wilcards<'a>(pattern: &'a str, text: &'a str) -> bool {
    if pattern.len() <= text.len() {
        pattern
            .bytes()
            .enumerate()
            .all(|(i, c)| c == b'?' || c == text.as_bytes()[i])
    } else {
        false
    }
}

pub(crate) fn match_wildcard<'a>(pattern: &'a str, text: &'a str) -> bool {
    let mut pat = pattern;
    let mut t = text;
    let mut asterisk = false;
    while !pat.is_empty() {
        let (newpat, m, cur_ast) = if let Some(i) = pat.find('*') {
            (&pat[i + 1..], &pat[..i], true)
        } else {
            (&pat[pat.len()..pat.len()], pat, false)
        };

        if !m.is_empty() {
            if !asterisk {
                // if first match
                if !starts_single_wilcards(m, t) {
                    return false;
                }
                t = &t[m.len()..];
            } else if cur_ast || !newpat.is_empty() {
                // after asterisk. only if some rest in pattern and
                // if last current character is asterisk
                let mut i = 0;
                // find first single wildcards occurrence.
                while i <= t.len() - m.len() && !starts_single_wilcards(m, &t[i..]) {
                    i += 1;
                }
                if i <= t.len() - m.len() {
                    // if found
                    t = &t[i + m.len()..];
                } else {
                    return false;
                }
            } else {
                // if last pattern is not asterisk
                if !starts_single_wilcards(m, &t[t.len() - m.len()..]) {
                    return false;
                }
                t = &t[t.len()..t.len()];
            }
        }

        asterisk = true;
        pat = newpat;
    }
    // if last character in pattern is '*' or text has been fully consumed
    (!pattern.is_empty() && pattern.as_bytes()[pattern.len() - 1] == b'*') || t.is_empty()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_irc_lines_codec() {
        let mut codec = IRCLinesCodec::new();
        let mut buf = BytesMut::new();
        codec.encode("my line".to_string(), &mut buf).unwrap();
        assert_eq!("my line\r\n".as_bytes(), buf);
        let mut buf = BytesMut::from("my line 2\n");
        assert_eq!(
            codec.decode(&mut buf).map_err(|e| e.to_string()),
            Ok(Some("my line 2".to_string()))
        );
        assert_eq!(buf, BytesMut::new());
        let mut buf = BytesMut::from("my line 2\r\n");
        assert_eq!(
            codec.decode(&mut buf).map_err(|e| e.to_string()),
            Ok(Some("my line 2".to_string()))
        );
        assert_eq!(buf, BytesMut::new());
    }

    #[test]
    fn test_irc_lines_codec_max_length() {
        let mut codec = IRCLinesCodec::new_with_max_length(16);
        let mut buf = BytesMut::new();
        codec
            .encode("shorter line".to_string(), &mut buf)
            .unwrap();
        assert_eq!("shorter line\r\n".as_bytes(), buf);
        let mut buf = BytesMut::new();
        codec
            .encode("something far too long for the wire".to_string(), &mut buf)
            .unwrap();
        assert_eq!("something far \r\n".as_bytes(), buf);
        assert_eq!(16, buf.len());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("ala").is_ok());
        assert!(validate_username("&ala").is_ok());
        assert!(!validate_username("#ala").is_ok());
        assert!(!validate_username("a.la").is_ok());
        assert!(!validate_username("a,la").is_ok());
        assert!(!validate_username("aL:a").is_ok());
    }

    #[test]
    fn test_validate_channel() {
        assert!(validate_channel("#ala").is_ok());
        assert!(!validate_channel("&ala").is_ok());
        assert!(!validate_channel("#al:a").is_ok());
        assert!(!validate_channel("#al,a").is_ok());
        assert!(!validate_channel("#al a").is_ok());
        assert!(!validate_channel("#").is_ok());
        assert!(!validate_channel("ala").is_ok());
    }

    #[test]
    fn test_validate_prefixed_channel() {
        use crate::command::CommandError::WrongParameter;
        use crate::command::CommandId::PINGId;
        assert!(validate_prefixed_channel("#ala", WrongParameter(PINGId, 0)).is_ok());
        assert!(validate_prefixed_channel("@#ala", WrongParameter(PINGId, 0)).is_ok());
        assert!(validate_prefixed_channel("%#ala", WrongParameter(PINGId, 0)).is_ok());
        assert!(validate_prefixed_channel("+#ala", WrongParameter(PINGId, 0)).is_ok());
        assert!(validate_prefixed_channel("+@#ala", WrongParameter(PINGId, 0)).is_ok());
        assert!(!validate_prefixed_channel("&ala", WrongParameter(PINGId, 0)).is_ok());
        assert!(!validate_prefixed_channel("#al:a", WrongParameter(PINGId, 0)).is_ok());
        assert!(!validate_prefixed_channel("#al,a", WrongParameter(PINGId, 0)).is_ok());
        assert!(!validate_prefixed_channel("*#ala", WrongParameter(PINGId, 0)).is_ok());
        assert!(!validate_prefixed_channel("#", WrongParameter(PINGId, 0)).is_ok());
        assert!(!validate_prefixed_channel("ala", WrongParameter(PINGId, 0)).is_ok());
    }

    #[test]
    fn test_is_valid_nickname() {
        assert!(is_valid_nickname(Dialect::Rfc1459, "luck"));
        assert!(is_valid_nickname(Dialect::Rfc1459, "luck[y]"));
        assert!(is_valid_nickname(Dialect::Rfc1459, "z9Z"));
        assert!(is_valid_nickname(Dialect::Rfc1459, "{lu}|^"));
        assert!(!is_valid_nickname(Dialect::Rfc1459, "lucky-day"));
        assert!(!is_valid_nickname(Dialect::Rfc1459, "lucky~"));
        assert!(!is_valid_nickname(Dialect::Rfc1459, ""));
        assert!(is_valid_nickname(Dialect::Rfc2810, "some_one"));
        assert!(!is_valid_nickname(Dialect::Rfc2810, "über"));

        assert!(is_valid_nickname(Dialect::Modern, "lucky-day"));
        assert!(is_valid_nickname(Dialect::Modern, "über"));
        assert!(is_valid_nickname(Dialect::Modern, "&oddity"));
        assert!(!is_valid_nickname(Dialect::Modern, "no space"));
        assert!(!is_valid_nickname(Dialect::Modern, "no,comma"));
        assert!(!is_valid_nickname(Dialect::Modern, "what?"));
        assert!(!is_valid_nickname(Dialect::Modern, "star*"));
        assert!(!is_valid_nickname(Dialect::Modern, "at@home"));
        assert!(!is_valid_nickname(Dialect::Modern, "b!ng"));
        assert!(!is_valid_nickname(Dialect::Modern, "plus+"));
        assert!(!is_valid_nickname(Dialect::Modern, "perc%"));
        assert!(!is_valid_nickname(Dialect::Modern, "hash#"));
        assert!(!is_valid_nickname(Dialect::Modern, ""));
    }

    #[test]
    fn test_casefold_name() {
        assert_eq!("lucky", casefold_name(Dialect::Modern, "LuCkY"));
        assert_eq!("lu[]\\~", casefold_name(Dialect::Modern, "Lu[]\\~"));
        assert_eq!("lucky", casefold_name(Dialect::Rfc1459, "LuCkY"));
        assert_eq!("lu{}|^", casefold_name(Dialect::Rfc1459, "Lu[]\\~"));
        assert_eq!("lu{}|^", casefold_name(Dialect::Rfc2810, "Lu{}|^"));
        assert_eq!("#big", casefold_name(Dialect::Rfc1459, "#BIG"));
    }

    #[test]
    fn test_normalize_sourcemask() {
        assert_eq!("bobby!*@*", normalize_sourcemask("bobby"));
        assert_eq!("*!*@host.com", normalize_sourcemask("*@host.com"));
        assert_eq!("bob!~b@*", normalize_sourcemask("bob!~b@*"));
    }

    #[tokio::test]
    async fn test_argon2_password() {
        let hash = argon2_hash_password("my_secret_phrase");
        assert_eq!(
            Ok(()),
            argon2_verify_password_async("my_secret_phrase".to_string(), hash.clone()).await
        );
        assert!(
            argon2_verify_password_async("other_phrase".to_string(), hash)
                .await
                .is_err()
        );
    }

    #[test]
    fn test_match_wildcard() {
        assert!(match_wildcard("somebody", "somebody"));
        assert!(!match_wildcard("somebody", "somebady"));
        assert!(match_wildcard("s?meb?dy", "samebady"));
        assert!(!match_wildcard("s?mec?dy", "samebady"));
        assert!(!match_wildcard("somebody", "somebod"));
        assert!(!match_wildcard("somebody", "somebodyis"));
        assert!(match_wildcard("so*body", "somebody"));
        assert!(match_wildcard("so**body", "somebody"));
        assert!(match_wildcard("so*body", "sobody"));
        assert!(match_wildcard("so*body*", "sobody"));
        assert!(match_wildcard("*so*body*", "sobody"));
        assert!(!match_wildcard("so*body", "sbody"));
        assert!(!match_wildcard("*so*body*", "sbody"));
        assert!(match_wildcard("so*body", "something body"));
        assert!(match_wildcard("so*bo*", "somebody"));
        assert!(match_wildcard("*", "Alice and Others"));
        assert!(!match_wildcard("", "Alice and Others"));
        assert!(match_wildcard("", ""));
        assert!(match_wildcard("*", ""));
        assert!(match_wildcard("***", ""));
        assert!(match_wildcard("* and Others", "Alice and Others"));
        assert!(!match_wildcard("* and Others", "Alice and others"));
        assert!(!match_wildcard("* and Others", "Aliceand Others"));
        assert!(match_wildcard("* and *", "Alice and Others"));
        assert!(match_wildcard("*** and **", "Alice and Others"));
        assert!(!match_wildcard("* and *", "Aliceand Others"));
        assert!(!match_wildcard("* and *", "Alice andOthers"));
        assert!(match_wildcard("*?and *", "Aliceand Others"));
        assert!(match_wildcard("* and?*", "Alice andOthers"));
        assert!(match_wildcard("la*la", "labulabela"));
        assert!(!match_wildcard("la*la", "labulabele"));
        assert!(match_wildcard("la*la*la", "labulalabela"));
        assert!(match_wildcard("greg*@somehere*", "greg-guru@somehere.net"));
        assert!(!match_wildcard("greg*@somehere*", "greg.somehere@@@"));
    }
}
