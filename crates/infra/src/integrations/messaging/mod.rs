//! WhatsApp gateway integration

pub mod client;

pub use client::EvolutionGateway;
