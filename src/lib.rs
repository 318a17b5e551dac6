//! # Chunk Admin
//!
//! An admin service for text chunks stored in a hosted vector index.
//!
//! Operators search chunks by id, by semantic query text, or by
//! module/name/path metadata, then view, edit, or delete them. A helper
//! endpoint rewrites multi-line queries through a language model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │   HTTP   │──▶│ query engine │──▶│ vector store │
//! │   CLI    │   │  mutations   │   │  (Pinecone)  │
//! └──────────┘   └──────┬───────┘   └──────────────┘
//!                       │
//!              ┌────────┴────────┐
//!              ▼                 ▼
//!        ┌───────────┐     ┌───────────┐
//!        │ embedding │     │    LLM    │
//!        │ (Voyage)  │     │ (OpenAI)  │
//!        └───────────┘     └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Chunk and request types |
//! | [`normalize`] | Name and path normalization |
//! | [`fuzzy`] | Bidirectional substring matching |
//! | [`filter`] | Exact-match remote filters |
//! | [`query`] | Chunk query engine and pagination |
//! | [`mutation`] | Fetch, update, delete by id |
//! | [`processor`] | Multi-line query rewriting |
//! | [`embedding`] | Embedding providers |
//! | [`llm`] | Language-model provider |
//! | [`store`] | Vector store trait, Pinecone and in-memory backends |
//! | [`providers`] | Lazily built collaborator handles |
//! | [`stats`] | Index statistics |
//! | [`server`] | HTTP API |

pub mod config;
pub mod embedding;
pub mod error;
pub mod filter;
pub mod fuzzy;
pub mod llm;
pub mod models;
pub mod mutation;
pub mod normalize;
pub mod processor;
pub mod providers;
pub mod query;
pub mod server;
pub mod stats;
pub mod store;
