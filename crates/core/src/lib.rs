pub mod jsonl;
pub mod ring;
pub mod trace;

pub use ring::RingBuffer;
pub use trace::*;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
