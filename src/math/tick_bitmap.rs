use crate::FastMap;
use crate::U256_1;
use crate::error::MathError;
use crate::math::bit_math::{least_significant_bit, most_significant_bit};
use alloy_primitives::U256;
use std::ops::Shr;

/// Decomposes a compressed tick into the `(word, bit)` coordinates of
/// the sparse bitmap.
pub fn position(tick: i32) -> (i16, u8) {
    (tick.shr(8) as i16, (tick % 256) as u8)
}

/// Reads the bitmap word at `word`, zero if absent.
pub fn get_word(bitmap: &FastMap<i16, U256>, word: i16) -> U256 {
    *bitmap.get(&word).unwrap_or(&U256::ZERO)
}

/// Toggles the initialized bit for `tick`, which must be aligned to
/// `tick_spacing`.
pub fn flip_tick(
    tick_bitmap: &mut FastMap<i16, U256>,
    tick: i32,
    tick_spacing: i32,
) -> Result<(), MathError> {
    if (tick % tick_spacing) != 0 {
        return Err(MathError::OutOfBounds);
    }

    let (word_pos, bit_pos) = position(tick / tick_spacing);
    let mask = U256_1 << bit_pos;
    let word = get_word(tick_bitmap, word_pos);
    tick_bitmap.insert(word_pos, word ^ mask);
    Ok(())
}

/// Finds the next initialized tick within the single bitmap word that
/// contains `tick`, searching down (`lte`) or up.
///
/// If the word holds no candidate the word-boundary tick is returned
/// with `initialized = false`, so a swap loop advances at most one word
/// per probe. This bounds the work done per step.
pub fn next_initialized_tick_within_one_word(
    bitmap: &FastMap<i16, U256>,
    tick: i32,
    tick_spacing: i32,
    lte: bool,
) -> Result<(i32, bool), MathError> {
    let mut compressed: i32 = tick / tick_spacing;

    // round toward negative infinity
    if tick < 0 && tick % tick_spacing != 0 {
        compressed -= 1;
    }

    if lte {
        let (word_pos, bit_pos) = position(compressed);

        // all bits at or to the right of the current bit
        let mask: U256 = (U256_1 << bit_pos) - U256_1 + (U256_1 << bit_pos);
        let masked: U256 = get_word(bitmap, word_pos) & mask;

        let initialized = !masked.is_zero();

        let next: i32 = if initialized {
            (compressed - (bit_pos - most_significant_bit(masked)?) as i32) * tick_spacing
        } else {
            (compressed - bit_pos as i32) * tick_spacing
        };
        Ok((next, initialized))
    } else {
        let (word_pos, bit_pos) = position(compressed + 1);

        // all bits at or to the left of the next bit
        let mask: U256 = !((U256_1 << bit_pos) - U256_1);
        let masked: U256 = get_word(bitmap, word_pos) & mask;

        let initialized = !masked.is_zero();

        let next: i32 = if initialized {
            (compressed + 1 + (least_significant_bit(masked)? - bit_pos) as i32) * tick_spacing
        } else {
            (compressed + 1 + (255u8 - bit_pos) as i32) * tick_spacing
        };
        Ok((next, initialized))
    }
}
