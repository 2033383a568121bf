//! A2S info wire codec.
//!
//! # Valve Documentation Reference
//! - [Server Queries](https://developer.valvesoftware.com/wiki/Server_queries)
//!
//! # Packet Layout
//! ```text
//! request:   FF FF FF FF | 54 | "Source Engine Query" 00 | [challenge u32 LE]
//! challenge: FF FF FF FF | 41 | challenge u32 LE
//! info:      FF FF FF FF | 49 | protocol u8 | name 00 | map 00 | folder 00 | game 00
//!            | app id u16 LE | players u8 | max players u8 | bots u8
//!            | server type u8 | platform u8 | password u8 | vac u8
//! ```
//!
//! Everything after the game name is optional: responders are seen to cut the
//! payload short, so missing trailing fields take documented defaults instead
//! of failing the decode. Pure functions only; no I/O.

use bytes::{Buf, BufMut, BytesMut};
use tracing::trace;

use crate::error::QueryFailure;
use crate::status::{ServerStatus, UNKNOWN};

/// Single-packet response prefix.
pub const PACKET_PREFIX: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// A2S_INFO request command ('T').
pub const A2S_INFO: u8 = 0x54;

/// S2C_CHALLENGE reply marker ('A').
pub const S2C_CHALLENGE: u8 = 0x41;

/// S2A_INFO reply marker ('I').
pub const S2A_INFO: u8 = 0x49;

/// Literal tag carried by every info request, NUL included.
pub const INFO_QUERY_TAG: &[u8] = b"Source Engine Query\0";

/// Prefix plus marker byte.
pub const HEADER_LEN: usize = 5;

/// Largest reply read in one receive; stays under a typical UDP MTU.
pub const MAX_PACKET_SIZE: usize = 1400;

pub const DEFAULT_PLAYERS: u8 = 0;
pub const DEFAULT_MAX_PLAYERS: u8 = 20;
pub const DEFAULT_BOTS: u8 = 0;
pub const DEFAULT_SERVER_TYPE: char = 'd';
pub const DEFAULT_PLATFORM: char = 'l';

/// What a reply datagram claims to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Server wants the request repeated with a token.
    Challenge,
    /// Server info payload.
    Info,
    /// Not a single-packet reply of this protocol.
    Unrecognized,
}

/// Builds the 25-byte A2S_INFO request.
pub fn build_info_request() -> Vec<u8> {
    let mut packet = Vec::with_capacity(HEADER_LEN + INFO_QUERY_TAG.len() + 4);
    packet.extend_from_slice(&PACKET_PREFIX);
    packet.push(A2S_INFO);
    packet.extend_from_slice(INFO_QUERY_TAG);
    packet
}

/// Builds the A2S_INFO request followed by the challenge token.
pub fn build_info_request_with_challenge(token: u32) -> Vec<u8> {
    let mut packet = build_info_request();
    packet.extend_from_slice(&token.to_le_bytes());
    packet
}

/// Classifies a reply by its header. Never fails.
pub fn classify_reply(raw: &[u8]) -> ReplyKind {
    if raw.len() < HEADER_LEN || raw[..4] != PACKET_PREFIX {
        return ReplyKind::Unrecognized;
    }
    match raw[4] {
        S2C_CHALLENGE => ReplyKind::Challenge,
        S2A_INFO => ReplyKind::Info,
        _ => ReplyKind::Unrecognized,
    }
}

/// Reads the challenge token from a challenge reply.
pub fn extract_challenge(raw: &[u8]) -> Result<u32, QueryFailure> {
    if raw.len() < HEADER_LEN + 4 {
        return Err(QueryFailure::malformed(format!(
            "challenge reply too short: {} bytes",
            raw.len()
        )));
    }
    let mut buf = &raw[HEADER_LEN..HEADER_LEN + 4];
    Ok(buf.get_u32_le())
}

/// Decodes an info reply (header included) into a [`ServerStatus`].
///
/// The protocol byte and the four strings are mandatory; a string without a
/// terminator fails the whole decode. Later fields fall back to defaults when
/// the payload runs out.
pub fn decode_info(raw: &[u8], ping_ms: u32) -> Result<ServerStatus, QueryFailure> {
    if classify_reply(raw) != ReplyKind::Info {
        return Err(QueryFailure::malformed("not an info reply"));
    }

    let mut buf = &raw[HEADER_LEN..];
    if !buf.has_remaining() {
        return Err(QueryFailure::malformed("info reply has no payload"));
    }
    let protocol_version = buf.get_u8();

    let server_name = read_string(&mut buf, "server name")?;
    let map = read_string(&mut buf, "map")?;
    let game_folder = read_string(&mut buf, "game folder")?;
    let game_name = read_string(&mut buf, "game name")?;

    let app_id = if buf.remaining() >= 2 {
        buf.get_u16_le()
    } else {
        0
    };
    trace!(app_id, "decoded app id");

    let players = read_u8_or(&mut buf, DEFAULT_PLAYERS);
    let max_players = read_u8_or(&mut buf, DEFAULT_MAX_PLAYERS);
    let bots = read_u8_or(&mut buf, DEFAULT_BOTS);
    let server_type = read_u8_or(&mut buf, DEFAULT_SERVER_TYPE as u8) as char;
    let platform = read_u8_or(&mut buf, DEFAULT_PLATFORM as u8) as char;
    let password_protected = read_u8_or(&mut buf, 0) != 0;
    let vac_enabled = read_u8_or(&mut buf, 0) != 0;

    Ok(ServerStatus {
        online: true,
        ping_ms,
        players,
        max_players,
        bots,
        server_name,
        map,
        game_folder,
        game_name,
        round_time: UNKNOWN.to_string(),
        password_protected,
        vac_enabled,
        protocol_version,
        server_type,
        platform,
    })
}

fn read_string(buf: &mut &[u8], field: &str) -> Result<String, QueryFailure> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| QueryFailure::malformed(format!("{field}: missing string terminator")))?;
    let text = String::from_utf8_lossy(&buf[..end]).into_owned();
    buf.advance(end + 1);
    Ok(text)
}

fn read_u8_or(buf: &mut &[u8], default: u8) -> u8 {
    if buf.has_remaining() {
        buf.get_u8()
    } else {
        default
    }
}

/// Encodes a full info reply for `status`.
///
/// Strings are written up to their first NUL; non-ASCII type or platform
/// characters are sent as `?`.
pub fn encode_info_reply(status: &ServerStatus, app_id: u16) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(64 + status.server_name.len() + status.map.len());
    buf.put_slice(&PACKET_PREFIX);
    buf.put_u8(S2A_INFO);
    buf.put_u8(status.protocol_version);
    for text in [
        &status.server_name,
        &status.map,
        &status.game_folder,
        &status.game_name,
    ] {
        let bytes = text.as_bytes();
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        buf.put_slice(&bytes[..end]);
        buf.put_u8(0);
    }
    buf.put_u16_le(app_id);
    buf.put_u8(status.players);
    buf.put_u8(status.max_players);
    buf.put_u8(status.bots);
    buf.put_u8(ascii_byte(status.server_type));
    buf.put_u8(ascii_byte(status.platform));
    buf.put_u8(status.password_protected as u8);
    buf.put_u8(status.vac_enabled as u8);
    buf.to_vec()
}

fn ascii_byte(c: char) -> u8 {
    if c.is_ascii() {
        c as u8
    } else {
        b'?'
    }
}

/// Encodes a challenge reply carrying `token`.
pub fn encode_challenge_reply(token: u32) -> Vec<u8> {
    let mut packet = Vec::with_capacity(HEADER_LEN + 4);
    packet.extend_from_slice(&PACKET_PREFIX);
    packet.push(S2C_CHALLENGE);
    packet.extend_from_slice(&token.to_le_bytes());
    packet
}

/// Recognizes an info request on the responder side.
///
/// Returns `Some(None)` for a plain request, `Some(Some(token))` for a
/// request carrying a challenge token, and `None` for anything else.
pub fn parse_info_request(raw: &[u8]) -> Option<Option<u32>> {
    let plain_len = HEADER_LEN + INFO_QUERY_TAG.len();
    if raw.len() < plain_len
        || raw[..4] != PACKET_PREFIX
        || raw[4] != A2S_INFO
        || &raw[HEADER_LEN..plain_len] != INFO_QUERY_TAG
    {
        return None;
    }
    match raw.len() - plain_len {
        0 => Some(None),
        4 => {
            let mut tail = &raw[plain_len..];
            Some(Some(tail.get_u32_le()))
        }
        _ => None,
    }
}
