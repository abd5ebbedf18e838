//! # heapscope - Interactive HPROF Heap Dump Explorer
//!
//! heapscope opens a Java/Android heap dump (HPROF format) and lets you walk
//! it: search classes by name, list a class's instances, inspect an
//! instance's fields and follow references from one object to the next.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    heap dump file (HPROF)                       │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ mmap (read-only)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  heapscope (This Crate)                         │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │    hprof     │──▶│    graph     │──▶│  navigation  │         │
//! │  │ (scan/decode)│   │ (index/query)│   │ (frame stack)│         │
//! │  └──────────────┘   └──────────────┘   └──────┬───────┘         │
//! │                                               │                 │
//! │                                    ┌──────────▼───────┐         │
//! │                                    │     session      │         │
//! │                                    │ (worker thread)  │         │
//! │                                    └──────────┬───────┘         │
//! │                                               │ views           │
//! │                              ┌────────────────┴──────┐          │
//! │                              ▼                       ▼          │
//! │                       ┌──────────────┐       ┌──────────────┐   │
//! │                       │     TUI      │       │   headless   │   │
//! │                       │  (ratatui)   │       │ (text/json)  │   │
//! │                       └──────────────┘       └──────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`hprof`]: record scanner, point-lookup decoder and a fixture writer
//! - [`graph`]: heap graph, class index, search, field decoding, rendering
//! - [`navigation`]: the explorer's stack of frames
//! - [`session`]: single background worker owning the opened dump
//! - [`tui`]: terminal interface
//! - [`cli`]: command-line arguments
//! - [`domain`]: identifiers and error types
//!
//! ## Typical Usage
//!
//! ```bash
//! # Explore interactively
//! heapscope app.hprof
//!
//! # Headless: search, open the first class, open its first instance
//! heapscope app.hprof --search Leak --select 0 --select 0
//! ```
//!
//! ## Key Concepts
//!
//! - **Single scan**: the file is read once at open time to record where
//!   every object lives; afterwards each lookup decodes one record
//! - **Class index**: instances grouped by class, in dump order
//! - **Field layout**: instance bytes hold the class's own fields first, then
//!   each superclass's

pub mod cli;
pub mod domain;
pub mod graph;
pub mod hprof;
pub mod navigation;
pub mod session;
pub mod tui;
