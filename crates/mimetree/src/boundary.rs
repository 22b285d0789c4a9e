//! Multipart boundary generation.
//!
//! Boundaries look like `----_=_NextPart_001_0a1b2c3d.65f0e1a2`: a counter
//! that keeps siblings within one serialization distinct, then an identity
//! value and a timestamp that keep separate runs apart. They are not meant
//! to be unguessable.

use chrono::Utc;

/// Source of the timestamp folded into boundaries.
///
/// In production, use [`SystemClock`]. In tests, use [`FixedClock`] so that
/// generated boundaries are deterministic.
pub trait Clock: Send + Sync {
    /// Returns the current Unix time in seconds.
    fn unix_seconds(&self) -> i64;
}

/// Clock backed by the system time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_seconds(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock that always reports the same instant.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn unix_seconds(&self) -> i64 {
        self.0
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn unix_seconds(&self) -> i64 {
        (**self).unix_seconds()
    }
}

/// Builds a boundary token.
///
/// Only the low 32 bits of the timestamp are used.
#[must_use]
pub fn make_boundary(counter: u32, discriminator: u32, unix_seconds: i64) -> String {
    let time = unix_seconds & 0xFFFF_FFFF;
    format!("----_=_NextPart_{counter:03}_{discriminator:08x}.{time:08x}")
}

/// Derives a discriminator from the address of a value.
///
/// Two values alive at the same time never share an address, which is all
/// the uniqueness boundaries need.
#[must_use]
pub fn identity_of<T>(value: &T) -> u32 {
    let address = std::ptr::from_ref(value) as usize;
    u32::try_from(address & 0xFFFF_FFFF).unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreadable_literal)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_boundary_format() {
        assert_eq!(
            make_boundary(1, 0xdead_beef, 0x65f0_e1a2),
            "----_=_NextPart_001_deadbeef.65f0e1a2"
        );
    }

    #[test]
    fn test_boundary_padding() {
        assert_eq!(make_boundary(0, 0, 0), "----_=_NextPart_000_00000000.00000000");
        assert_eq!(make_boundary(42, 0x1f, 0x2a), "----_=_NextPart_042_0000001f.0000002a");
        assert_eq!(make_boundary(1234, 1, 1), "----_=_NextPart_1234_00000001.00000001");
    }

    #[test]
    fn test_boundary_time_is_truncated() {
        assert_eq!(
            make_boundary(1, 1, 0x1_0000_0002),
            "----_=_NextPart_001_00000001.00000002"
        );
    }

    #[test]
    fn test_counter_keeps_siblings_distinct() {
        let clock = FixedClock(1_700_000_000);
        let seen: HashSet<_> = (0..500)
            .map(|i| make_boundary(i, 7, clock.unix_seconds()))
            .collect();
        assert_eq!(seen.len(), 500);
    }

    #[test]
    fn test_identity_differs_for_live_values() {
        let a = [0u8; 4];
        let b = [0u8; 4];
        assert_ne!(identity_of(&a), identity_of(&b));
        assert_eq!(identity_of(&a), identity_of(&a));
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.unix_seconds() > 1_577_836_800);
    }
}
