// Small shared helpers: nucleotide handling, stable hashing, process timing.

use std::time::Duration;

/// Complement of a single uppercase nucleotide. Anything outside {A,C,G,T}
/// maps to `N`.
#[inline]
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' => b'A',
        _ => b'N',
    }
}

/// Reverse complement of an uppercase nucleotide sequence.
pub fn rev_comp(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

#[inline]
pub fn is_canonical_base(base: u8) -> bool {
    matches!(base, b'A' | b'C' | b'G' | b'T')
}

/// 64-bit integer finalizer (Wang mix). Invertible, so distinct inputs stay
/// distinct.
pub fn hash_64(key: u64) -> u64 {
    let mut key = key;
    key = key.wrapping_add(!key.wrapping_shl(32));
    key ^= key.wrapping_shr(22);
    key = key.wrapping_add(!key.wrapping_shl(13));
    key ^= key.wrapping_shr(8);
    key = key.wrapping_add(key.wrapping_shl(3));
    key ^= key.wrapping_shr(15);
    key = key.wrapping_add(!key.wrapping_shl(27));
    key ^= key.wrapping_shr(31);
    key
}

/// Stable 64-bit hash of a nucleotide sequence: 3-bit codes packed into words
/// chained through `hash_64`. Independent of platform and process, unlike the
/// standard library hasher.
pub fn hash_seq(seq: &[u8]) -> u64 {
    let mut state = hash_64(seq.len() as u64);
    let mut word: u64 = 0;
    let mut filled = 0u32;

    for &base in seq {
        let code = match base {
            b'A' => 0u64,
            b'C' => 1,
            b'G' => 2,
            b'T' => 3,
            _ => 4,
        };
        word = (word << 3) | code;
        filled += 1;
        if filled == 21 {
            state = hash_64(state ^ word);
            word = 0;
            filled = 0;
        }
    }

    if filled > 0 {
        state = hash_64(state ^ word);
    }
    state
}

/// CPU time (user + system) consumed by this process, in seconds.
pub fn cputime() -> f64 {
    let rusage = unsafe {
        let mut rusage = std::mem::MaybeUninit::uninit();
        libc::getrusage(libc::RUSAGE_SELF, rusage.as_mut_ptr());
        rusage.assume_init()
    };
    let user_time = rusage.ru_utime;
    let sys_time = rusage.ru_stime;
    (user_time.tv_sec as f64 + user_time.tv_usec as f64 * 1e-6)
        + (sys_time.tv_sec as f64 + sys_time.tv_usec as f64 * 1e-6)
}

/// Render a duration as a compact human-readable string, e.g. `1h02m03.412s`.
pub fn humanized(runtime: Duration) -> String {
    let total = runtime.as_secs_f64();
    let hours = (total / 3600.0) as u64;
    let minutes = ((total % 3600.0) / 60.0) as u64;
    let seconds = total % 60.0;

    if hours > 0 {
        format!("{}h{:02}m{:06.3}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{:06.3}s", minutes, seconds)
    } else {
        format!("{:.3}s", seconds)
    }
}
