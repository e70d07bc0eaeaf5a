//! Scripted doubles for unit tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::agents::{AgentOutput, SpecializedAgent, TeamMember};
use crate::llm::{LanguageModel, Message, ModelProfile};
use crate::workflow::WorkflowState;
use crate::{Error, Result};

/// Language model that replays scripted replies in order
///
/// Running out of replies is an `Error::LlmApi`.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    calls: Mutex<Vec<(ModelProfile, Vec<Message>)>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a failing call
    pub fn then_fail(self, message: &str) -> Self {
        self.replies.lock().unwrap().push_back(Err(message.to_string()));
        self
    }

    /// Queue another reply
    pub fn then_reply(self, reply: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    /// Every call so far
    pub fn calls(&self) -> Vec<(ModelProfile, Vec<Message>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn invoke(&self, profile: ModelProfile, messages: &[Message]) -> Result<String> {
        self.calls.lock().unwrap().push((profile, messages.to_vec()));
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(Error::LlmApi(message)),
            None => Err(Error::LlmApi("no scripted reply left".to_string())),
        }
    }
}

/// Specialized agent with a fixed reply
pub struct StubAgent {
    member: TeamMember,
    reply: std::result::Result<String, String>,
    runs: AtomicUsize,
}

impl StubAgent {
    pub fn new(member: TeamMember, reply: &str) -> Self {
        Self {
            member,
            reply: Ok(reply.to_string()),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn failing(member: TeamMember, message: &str) -> Self {
        Self {
            member,
            reply: Err(message.to_string()),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpecializedAgent for StubAgent {
    fn member(&self) -> TeamMember {
        self.member
    }

    async fn run(&self, _state: &WorkflowState) -> Result<AgentOutput> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(reply) => Ok(AgentOutput::new(reply.clone())),
            Err(message) => Err(Error::AgentExecution(message.clone())),
        }
    }
}
