//! Stack safety utilities for deep recursion.
//!
//! PFA programs are trees of expressions; type-checking and evaluation
//! both recurse along that structure, and `for`/`foreach`/user-function
//! calls can nest arbitrarily deeply inside `do` blocks. This crate grows
//! the stack on demand so a pathologically nested document type-checks or
//! runs instead of overflowing the thread stack.
//!
//! # Platform Support
//!
//! - **Native targets**: uses the `stacker` crate to grow the stack.
//! - **WASM targets**: no-op passthrough.

#[cfg(not(target_arch = "wasm32"))]
const RED_ZONE: usize = 100 * 1024;

#[cfg(not(target_arch = "wasm32"))]
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Ensure sufficient stack space is available before executing `f`.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_recursion_does_not_overflow() {
        fn deep_recurse(n: u64) -> u64 {
            ensure_sufficient_stack(|| if n == 0 { 0 } else { deep_recurse(n - 1) + 1 })
        }
        assert_eq!(deep_recurse(100_000), 100_000);
    }

    #[test]
    fn returns_closure_result() {
        assert_eq!(ensure_sufficient_stack(|| 42), 42);
    }
}
