//! Unit tests for the content generation SDK
//!
//! Shared fakes live here; each submodule covers one area.

pub mod error_tests;
pub mod pipeline_tests;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::core::GenerationClient;
use crate::error::{Result, ServiceError};

/// Generation client replaying scripted answers and counting calls.
///
/// Once the script runs out the last answer repeats.
pub struct ScriptedClient {
    answers: Mutex<VecDeque<Result<String>>>,
    last: Mutex<Option<String>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicU32,
}

impl ScriptedClient {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_results(answers.into_iter().map(|a| Ok(a.into())))
    }

    pub fn with_results<I>(answers: I) -> Self
    where
        I: IntoIterator<Item = Result<String>>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn send(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        let next = self.answers.lock().unwrap().pop_front();
        match next {
            Some(Ok(answer)) => {
                *self.last.lock().unwrap() = Some(answer.clone());
                Ok(answer)
            }
            Some(Err(err)) => Err(err),
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| ServiceError::empty_response("script exhausted")),
        }
    }
}
