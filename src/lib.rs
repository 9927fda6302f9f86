//! tutor-talk: generates narrated, quiz-backed learning modules from a
//! title, stores them, and grades learners' answers.

pub mod api;
pub mod config;
pub mod llm;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod quiz;
pub mod storage;
pub mod store;
pub mod tts;
