//! Cross-subsystem scenarios.

pub mod fixtures;

#[cfg(test)]
mod concurrency;
#[cfg(test)]
mod durability;
#[cfg(test)]
mod gating;
#[cfg(test)]
mod lifecycle;
#[cfg(test)]
mod realtime;
#[cfg(test)]
mod referrals;
