//! Hamming single-error-correct, double-error-detect codec over one
//! 32-bit lane.
//!
//! The codeword is the extended Hamming(38,32) code plus an overall
//! parity bit: six syndrome bits cover codeword positions 1..=38, and
//! the seventh bit is even parity over everything. That check word is
//! stored alongside the data; the data word itself is never rearranged,
//! so a disabled decoder can pass it through untouched.

/// Width of the stored check word for one 32-bit lane.
pub const PARITY_BITS: u32 = 7;

const SYNDROME_MASK: u32 = 0x3F;
const TOP_POSITION: u32 = 38;

/// Outcome of decoding one lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum DecodeStatus {
    /// No bit error.
    Clean,
    /// A single-bit error was corrected.
    Corrected,
    /// A double-bit error was detected; the data is not trustworthy.
    Uncorrectable,
}

/// Decoded lane: the (possibly corrected) data and what happened to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Decoded {
    /// Data after correction, or as received when uncorrectable.
    pub data: u32,
    /// What the decoder observed.
    pub status: DecodeStatus,
}

/// Distributes the 32 data bits over the non-power-of-two codeword
/// positions 3..=38, in ascending order.
fn spread(data: u32) -> u64 {
    let mut word = 0u64;
    let mut position = 1u32;
    for bit in 0..u32::BITS {
        while position.is_power_of_two() {
            position += 1;
        }
        if data >> bit & 1 == 1 {
            word |= 1 << position;
        }
        position += 1;
    }
    word
}

/// Data bit index for a codeword position, if that position carries data.
fn data_bit_at(position: u32) -> Option<u32> {
    if position == 0 || position > TOP_POSITION || position.is_power_of_two() {
        return None;
    }
    let mut index = 0;
    for p in 1..position {
        if !p.is_power_of_two() {
            index += 1;
        }
    }
    Some(index)
}

/// Computes the check word for one data lane.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode(data: u32) -> u32 {
    let word = spread(data);
    let mut parity = 0u32;
    for (index, check) in [1u32, 2, 4, 8, 16, 32].into_iter().enumerate() {
        let mut bit = 0u32;
        for position in 1..=TOP_POSITION {
            if position & check != 0 {
                bit ^= (word >> position & 1) as u32;
            }
        }
        parity |= bit << index;
    }
    let overall = (data.count_ones() + parity.count_ones()) & 1;
    parity | overall << 6
}

/// Decodes one data lane against its stored check word.
///
/// A nonzero syndrome with even total parity means two bits flipped;
/// the data is reported [`DecodeStatus::Uncorrectable`] and returned
/// unmodified.
#[must_use]
pub fn decode(data: u32, parity: u32) -> Decoded {
    let stored_checks = parity & SYNDROME_MASK;
    let stored_overall = parity >> 6 & 1;
    let syndrome = (encode(data) & SYNDROME_MASK) ^ stored_checks;
    // Even over the whole received codeword when no or two bits flipped,
    // odd when exactly one did.
    let total_parity =
        (data.count_ones() + stored_checks.count_ones() + stored_overall) & 1;

    if syndrome == 0 && total_parity == 0 {
        return Decoded {
            data,
            status: DecodeStatus::Clean,
        };
    }
    if total_parity == 0 {
        return Decoded {
            data,
            status: DecodeStatus::Uncorrectable,
        };
    }

    // Odd total parity: exactly one bit is wrong. The syndrome names its
    // codeword position; zero means the overall parity bit itself, a
    // power of two means a check bit, neither of which touches the data.
    match data_bit_at(syndrome) {
        Some(bit) => Decoded {
            data: data ^ (1 << bit),
            status: DecodeStatus::Corrected,
        },
        None if syndrome <= TOP_POSITION => Decoded {
            data,
            status: DecodeStatus::Corrected,
        },
        // A syndrome past the last codeword position cannot come from a
        // single flip.
        None => Decoded {
            data,
            status: DecodeStatus::Uncorrectable,
        },
    }
}
