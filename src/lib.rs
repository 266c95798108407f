//! # tcm
//!
//! Technical Credit Miner: scans a GitHub repository and asks a language
//! model which "technical credit" categories its code exhibits, grounded in
//! labeled example snippets and an article on the topic.
//!
//! ## Architecture
//!
//! ```text
//!   training (once, or with --train)
//!   ┌──────────────┐   scrape + split    ┌──────────────────┐
//!   │ TC article   │ ──────────────────▶ │ web_tech_credit  │
//!   └──────────────┘                     └──────────────────┘
//!   ┌──────────────┐  .java + metadata   ┌──────────────────┐
//!   │ TC-Examples  │ ──────────────────▶ │ tech_credit_code │
//!   └──────────────┘                     └──────────────────┘
//!
//!   per job
//!                    ┌───────────┐
//!                    │   start   │
//!                    └─────┬─────┘
//!             ┌────────────┴────────────┐
//!             ▼                         ▼
//!   ┌───────────────────┐     ┌───────────────────┐
//!   │ retrieve          │     │ retrieve_doc      │
//!   │ repo .java chunks │     │ question vs.      │
//!   │ top-k vs. code    │     │ web collection    │
//!   └─────────┬─────────┘     └─────────┬─────────┘
//!             └────────────┬────────────┘
//!                          ▼
//!               ┌─────────────────────┐
//!               │ generate            │
//!               │ prompt → chat model │
//!               └─────────────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - Defaults, environment overrides, and the dotenv secrets file
//! - [`models`] - Shared data types: `Document`, `QueryMatch`, `Part`, `Job`
//! - [`github`] - Path filter combinators and the GitHub repository loader
//! - [`chunking`] - AST-aware code chunking and the recursive prose splitter
//! - [`web`] - Article fetching, boilerplate stripping and extraction
//! - [`search::vector`] - On-disk vector store with cosine distance search
//! - [`search::collection`] - Named collections pairing a store with an embedder
//! - [`search::top_k`] - Bounded-heap selection of the closest queries
//! - [`llm`] - Chat and embedding providers, prompt construction
//! - [`pipeline`] - The retrieve / retrieve_doc / generate graph and training
//! - [`batch`] - Batch job files and the responses file
//! - [`state`] - Application wiring shared by the CLI

pub mod batch;
pub mod chunking;
pub mod config;
pub mod error;
pub mod github;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod state;
pub mod web;
