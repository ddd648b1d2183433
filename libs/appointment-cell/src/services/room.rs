// libs/appointment-cell/src/services/room.rs
use rand::Rng;

const ROOM_CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

pub const ROOM_CODE_LENGTH: usize = 6;

/// Generate a random alphanumeric room code. Each position is drawn
/// independently from the 62-character alphabet.
pub fn generate_room_code(length: usize) -> String {
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..ROOM_CODE_CHARS.len());
            ROOM_CODE_CHARS[idx] as char
        })
        .collect()
}

/// Room code at the standard length used for online visits.
pub fn default_room_code() -> String {
    generate_room_code(ROOM_CODE_LENGTH)
}
