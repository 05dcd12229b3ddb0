#[cfg(not(feature = "std"))]
pub use x86_no_std::*;

#[cfg(feature = "std")]
pub use x86_std::*;

#[cfg(feature = "std")]
mod x86_std {
    #[inline]
    pub fn support_sse2() -> bool {
        is_x86_feature_detected!("sse2")
    }
}

// Without std there is no runtime detection; trust what the target was
// compiled for.
#[cfg(not(feature = "std"))]
mod x86_no_std {
    #[inline]
    pub fn support_sse2() -> bool {
        cfg!(target_feature = "sse2")
    }
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(all(feature = "std", target_arch = "x86_64"))]
    fn test_support_sse2() {
        // sse2 is part of the x86_64 baseline.
        assert!(super::support_sse2());
    }
}
