//! # DocQA — local document question answering
//!
//! Indexes PDF and text files into a SQLite vector index, retrieves the
//! chunks closest to a question and asks a local Ollama model to answer
//! from them. A separate TF-IDF recommender suggests learning resources.
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading and validation
//! - **[`indexer`]** — File loading, text splitting, corpus index builds
//! - **[`embedder`]** — Text embedding via an Ollama embedding endpoint
//! - **[`db`]** — SQLite + sqlite-vec vector index (build, load, search)
//! - **[`rag`]** — Retriever, prompt templates, answer generation, session
//! - **[`recommend`]** — TF-IDF resource recommendations
//! - **[`web`]** — Local web form (axum)

pub mod config;
pub mod db;
pub mod embedder;
pub mod error;
pub mod indexer;
pub mod rag;
pub mod recommend;
pub mod web;
