#![deny(missing_docs)]

//! Core library for the medical document service: OCR, PDF text extraction, retrieval-augmented
//! diagnosis over Ollama and Qdrant, and PDF report rendering.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Retrieval-augmented SOAP diagnosis.
pub mod diagnosis;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Medical corpora: dataset loading, seeding, and retrieval.
pub mod knowledge;
/// Text generation client abstraction and adapters.
pub mod llm;
/// Structured logging and tracing setup.
pub mod logging;
/// Request metrics helpers.
pub mod metrics;
/// Model archive installation.
pub mod models;
/// OCR engine abstraction and the Tesseract adapter.
pub mod ocr;
/// PDF text extraction and report rendering.
pub mod pdf;
/// Qdrant vector store integration.
pub mod qdrant;
/// Service layer behind the HTTP surface.
pub mod service;
/// Multipart upload validation and staging.
pub mod uploads;
