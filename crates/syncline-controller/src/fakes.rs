//! Scripted stand-ins for the transport and the remote repositories.
//!
//! Kept in the library (not behind `cfg(test)`) so integration tests and
//! downstream consumers can drive reconcilers without a live backend. Every
//! fake records the mutations it saw; tests assert on those to pin down
//! idempotence and minimal-mutation behavior.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use syncline_core::{
    diff_attachments, Context, ContextRecord, Policy, PolicyRecord, RemoteAttachment, RunRecord,
    RunState, Space, SpaceRecord, Stack, StackOutput, StackRecord,
};
use uuid::Uuid;

use crate::error::RemoteError;
use crate::remote::transport::{Operation, RemoteTransport};
use crate::remote::{ContextRemote, PolicyRemote, RunRemote, SpaceRemote, StackRemote};
use crate::resolver::ResolvedContext;

const FAKE_BASE_URL: &str = "https://backend.example.com";

/// Transport answering from a scripted queue of payloads.
#[derive(Default)]
pub struct ScriptedTransport {
    payloads: Mutex<VecDeque<Value>>,
    calls: Mutex<Vec<Operation>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_payload(&self, payload: Value) {
        self.payloads.lock().unwrap().push_back(payload);
    }

    pub fn calls(&self) -> Vec<Operation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteTransport for ScriptedTransport {
    async fn execute(&self, op: Operation) -> Result<Value, RemoteError> {
        self.calls.lock().unwrap().push(op.clone());
        self.payloads
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| RemoteError::Transport(format!("no scripted payload for {}", op.name)))
    }

    fn resource_url(&self, path: &str) -> String {
        format!("{FAKE_BASE_URL}{path}")
    }
}

fn mint_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

#[derive(Default)]
struct SpaceState {
    record: Option<SpaceRecord>,
    creates: u32,
    updates: u32,
    fail_create: bool,
}

#[derive(Default)]
pub struct FakeSpaceRemote {
    state: Mutex<SpaceState>,
}

impl FakeSpaceRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_create(&self) {
        self.state.lock().unwrap().fail_create = true;
    }

    pub fn creates(&self) -> u32 {
        self.state.lock().unwrap().creates
    }

    pub fn updates(&self) -> u32 {
        self.state.lock().unwrap().updates
    }
}

#[async_trait]
impl SpaceRemote for FakeSpaceRemote {
    async fn get(&self, _space: &Space) -> Result<SpaceRecord, RemoteError> {
        self.state
            .lock()
            .unwrap()
            .record
            .clone()
            .ok_or_else(|| RemoteError::not_found("space"))
    }

    async fn create(&self, space: &Space) -> Result<SpaceRecord, RemoteError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(RemoteError::Transport("scripted create failure".into()));
        }
        let id = mint_id(space.name());
        let record = SpaceRecord {
            url: format!("{FAKE_BASE_URL}/spaces/{id}"),
            id,
        };
        state.record = Some(record.clone());
        state.creates += 1;
        Ok(record)
    }

    async fn update(&self, _space: &Space) -> Result<SpaceRecord, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.updates += 1;
        state
            .record
            .clone()
            .ok_or_else(|| RemoteError::not_found("space"))
    }
}

#[derive(Default)]
struct StackState {
    record: Option<StackRecord>,
    creates: u32,
    updates: u32,
    fail_create: bool,
}

#[derive(Default)]
pub struct FakeStackRemote {
    state: Mutex<StackState>,
}

impl FakeStackRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_create(&self) {
        self.state.lock().unwrap().fail_create = true;
    }

    /// Script the outputs the next reads report, as after a finished run.
    pub fn set_outputs(&self, outputs: Vec<StackOutput>) {
        let mut state = self.state.lock().unwrap();
        if let Some(record) = &mut state.record {
            record.outputs = outputs;
        }
    }

    pub fn creates(&self) -> u32 {
        self.state.lock().unwrap().creates
    }

    pub fn updates(&self) -> u32 {
        self.state.lock().unwrap().updates
    }
}

#[async_trait]
impl StackRemote for FakeStackRemote {
    async fn get(&self, _stack: &Stack) -> Result<StackRecord, RemoteError> {
        let state = self.state.lock().unwrap();
        let mut record = state
            .record
            .clone()
            .ok_or_else(|| RemoteError::not_found("stack"))?;
        record.url = None;
        Ok(record)
    }

    async fn create(
        &self,
        stack: &Stack,
        _space_id: Option<&str>,
    ) -> Result<StackRecord, RemoteError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(RemoteError::Transport("scripted create failure".into()));
        }
        let id = crate::remote::slug::safe_slug(stack.name());
        let record = StackRecord {
            url: Some(format!("{FAKE_BASE_URL}/stack/{id}")),
            id,
            tracked_commit: stack.spec.commit_sha.clone(),
            outputs: vec![],
        };
        state.record = Some(record.clone());
        state.creates += 1;
        Ok(record)
    }

    async fn update(
        &self,
        _stack: &Stack,
        _space_id: Option<&str>,
    ) -> Result<StackRecord, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.updates += 1;
        state
            .record
            .clone()
            .ok_or_else(|| RemoteError::not_found("stack"))
    }
}

#[derive(Default)]
struct PolicyState {
    record: Option<PolicyRecord>,
    attachments: Vec<RemoteAttachment>,
    attach_calls: Vec<String>,
    detach_calls: Vec<String>,
    creates: u32,
    updates: u32,
}

impl PolicyState {
    fn converge(&mut self, desired: &[String]) {
        let diff = diff_attachments(desired, &self.attachments);
        for attachment_id in &diff.to_detach {
            self.attachments.retain(|a| &a.attachment_id != attachment_id);
            self.detach_calls.push(attachment_id.clone());
        }
        for target in &diff.to_attach {
            self.attachments.push(RemoteAttachment {
                attachment_id: mint_id("att"),
                target_id: target.clone(),
                auto_attached: false,
            });
            self.attach_calls.push(target.clone());
        }
    }
}

#[derive(Default)]
pub struct FakePolicyRemote {
    state: Mutex<PolicyState>,
}

impl FakePolicyRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an attachment the remote created by itself (label matching).
    pub fn seed_auto_attachment(&self, target_id: &str) {
        self.state.lock().unwrap().attachments.push(RemoteAttachment {
            attachment_id: mint_id("att"),
            target_id: target_id.into(),
            auto_attached: true,
        });
    }

    pub fn attachments(&self) -> Vec<RemoteAttachment> {
        self.state.lock().unwrap().attachments.clone()
    }

    pub fn attach_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().attach_calls.clone()
    }

    pub fn detach_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().detach_calls.clone()
    }

    pub fn creates(&self) -> u32 {
        self.state.lock().unwrap().creates
    }

    pub fn updates(&self) -> u32 {
        self.state.lock().unwrap().updates
    }
}

#[async_trait]
impl PolicyRemote for FakePolicyRemote {
    async fn get(&self, policy: &Policy) -> Result<PolicyRecord, RemoteError> {
        if policy.status.id.is_empty() {
            return Err(RemoteError::not_found("policy"));
        }
        self.state
            .lock()
            .unwrap()
            .record
            .clone()
            .ok_or_else(|| RemoteError::not_found("policy"))
    }

    async fn create(
        &self,
        policy: &Policy,
        _space_id: Option<&str>,
        stack_ids: &[String],
    ) -> Result<PolicyRecord, RemoteError> {
        let mut state = self.state.lock().unwrap();
        let record = PolicyRecord {
            id: mint_id(policy.name()),
        };
        state.record = Some(record.clone());
        state.creates += 1;
        state.converge(stack_ids);
        Ok(record)
    }

    async fn update(
        &self,
        _policy: &Policy,
        _space_id: Option<&str>,
        stack_ids: &[String],
    ) -> Result<PolicyRecord, RemoteError> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .record
            .clone()
            .ok_or_else(|| RemoteError::not_found("policy"))?;
        state.updates += 1;
        state.converge(stack_ids);
        Ok(record)
    }
}

#[derive(Default)]
struct ContextState {
    record: Option<ContextRecord>,
    last_resolved: Option<ResolvedContext>,
    creates: u32,
    updates: u32,
}

#[derive(Default)]
pub struct FakeContextRemote {
    state: Mutex<ContextState>,
}

impl FakeContextRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// The payload the last create/update was asked to apply.
    pub fn last_resolved(&self) -> Option<ResolvedContext> {
        self.state.lock().unwrap().last_resolved.clone()
    }

    pub fn creates(&self) -> u32 {
        self.state.lock().unwrap().creates
    }

    pub fn updates(&self) -> u32 {
        self.state.lock().unwrap().updates
    }
}

#[async_trait]
impl ContextRemote for FakeContextRemote {
    async fn get(&self, context: &Context) -> Result<ContextRecord, RemoteError> {
        if context.status.id.is_empty() {
            return Err(RemoteError::not_found("context"));
        }
        self.state
            .lock()
            .unwrap()
            .record
            .clone()
            .ok_or_else(|| RemoteError::not_found("context"))
    }

    async fn create(
        &self,
        context: &Context,
        resolved: &ResolvedContext,
    ) -> Result<ContextRecord, RemoteError> {
        let mut state = self.state.lock().unwrap();
        let record = ContextRecord {
            id: mint_id(context.name()),
        };
        state.record = Some(record.clone());
        state.last_resolved = Some(resolved.clone());
        state.creates += 1;
        Ok(record)
    }

    async fn update(
        &self,
        _context: &Context,
        resolved: &ResolvedContext,
    ) -> Result<ContextRecord, RemoteError> {
        let mut state = self.state.lock().unwrap();
        let record = state
            .record
            .clone()
            .ok_or_else(|| RemoteError::not_found("context"))?;
        state.last_resolved = Some(resolved.clone());
        state.updates += 1;
        Ok(record)
    }
}

struct RunRemoteState {
    states: VecDeque<RunState>,
    last_state: RunState,
    triggers: u32,
    polls: u32,
    deleted: bool,
    fail_trigger: bool,
    poll_failures: u32,
}

impl Default for RunRemoteState {
    fn default() -> Self {
        Self {
            states: VecDeque::new(),
            last_state: RunState::Queued,
            triggers: 0,
            polls: 0,
            deleted: false,
            fail_trigger: false,
            poll_failures: 0,
        }
    }
}

/// Fake run backend: triggering mints a run in `QUEUED`, polls walk through
/// the scripted state sequence and then hold the last state.
#[derive(Default)]
pub struct FakeRunRemote {
    state: Mutex<RunRemoteState>,
}

impl FakeRunRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_states(&self, states: impl IntoIterator<Item = RunState>) {
        self.state.lock().unwrap().states.extend(states);
    }

    /// Make the run disappear from the remote, as after a manual deletion.
    pub fn delete_run(&self) {
        self.state.lock().unwrap().deleted = true;
    }

    pub fn fail_trigger(&self) {
        self.state.lock().unwrap().fail_trigger = true;
    }

    /// Make the next `count` polls fail with a transport error.
    pub fn fail_polls(&self, count: u32) {
        self.state.lock().unwrap().poll_failures = count;
    }

    pub fn triggers(&self) -> u32 {
        self.state.lock().unwrap().triggers
    }

    pub fn polls(&self) -> u32 {
        self.state.lock().unwrap().polls
    }
}

#[async_trait]
impl RunRemote for FakeRunRemote {
    async fn trigger(&self, stack_id: &str) -> Result<RunRecord, RemoteError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_trigger {
            return Err(RemoteError::Transport("scripted trigger failure".into()));
        }
        let id = mint_id("run");
        state.triggers += 1;
        Ok(RunRecord {
            url: Some(format!("{FAKE_BASE_URL}/stack/{stack_id}/run/{id}")),
            id: Some(id),
            state: Some(RunState::Queued),
        })
    }

    async fn get(&self, _stack_id: &str, _run_id: &str) -> Result<RunRecord, RemoteError> {
        let mut state = self.state.lock().unwrap();
        if state.deleted {
            return Err(RemoteError::not_found("run"));
        }
        if state.poll_failures > 0 {
            state.poll_failures -= 1;
            return Err(RemoteError::Transport("scripted poll failure".into()));
        }
        state.polls += 1;
        if let Some(next) = state.states.pop_front() {
            state.last_state = next;
        }
        Ok(RunRecord {
            id: None,
            url: None,
            state: Some(state.last_state),
        })
    }
}
