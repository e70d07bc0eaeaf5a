//! Prompt construction
//!
//! `PromptBuilder` turns the workflow state into the message list for one
//! node. `TemplatePromptBuilder` carries the default career-assistant
//! templates.

use crate::agents::TeamMember;
use crate::llm::Message;
use crate::workflow::{TaskStatus, WorkflowState, USER_SPEAKER};

/// Marker the coordinator emits to hand a request to the planner
pub const HANDOFF_TO_PLANNER: &str = "handoff_to_planner";

/// Which prompt to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Coordinator,
    Planner,
    Supervisor,
    /// A team member, workers and reporter alike
    Member(TeamMember),
}

/// Builds prompts from workflow state
///
/// Implementations must be pure: the same state gives the same messages.
pub trait PromptBuilder: Send + Sync {
    fn build(&self, kind: NodeKind, state: &WorkflowState) -> Vec<Message>;
}

/// Default prompt templates
#[derive(Debug, Clone, Default)]
pub struct TemplatePromptBuilder;

impl TemplatePromptBuilder {
    pub fn new() -> Self {
        Self
    }
}

impl PromptBuilder for TemplatePromptBuilder {
    fn build(&self, kind: NodeKind, state: &WorkflowState) -> Vec<Message> {
        let mut messages = vec![Message::system(system_prompt(kind, state))];

        if kind == NodeKind::Supervisor && !state.full_plan.is_empty() {
            messages.push(Message::user(format!("Current plan:\n{}", state.full_plan)));
        }
        if let NodeKind::Member(_) = kind {
            if let Some(context) = run_context(state) {
                messages.push(Message::user(context));
            }
        }

        messages.extend(transcript_messages(state));

        if kind == NodeKind::Supervisor {
            messages.push(Message::user(progress_summary(state)));
        }

        messages
    }
}

/// Transcript as prompt messages; non-user speakers are labelled
pub fn transcript_messages(state: &WorkflowState) -> Vec<Message> {
    state
        .messages
        .iter()
        .map(|m| {
            if m.speaker == USER_SPEAKER {
                Message::user(m.content.clone())
            } else {
                Message::user(format!("[{}]\n{}", m.speaker, m.content))
            }
        })
        .collect()
}

/// One line per team member with its role and whether it is optional
pub fn format_team_members() -> String {
    TeamMember::ALL
        .iter()
        .map(|m| {
            let status = if m.is_optional() { "(Optional)" } else { "(Required)" };
            format!("- {}: {} {}", m.as_str(), m.description(), status)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn system_prompt(kind: NodeKind, state: &WorkflowState) -> String {
    match kind {
        NodeKind::Coordinator => format!(
            "You are a career assistant coordinator, the primary interface between the user and the career agent system.\n\n\
             Your responsibilities:\n\
             1. Understand user requests about career-related topics\n\
             2. Decide if the task requires planning and agent collaboration\n\
             3. Handle simple requests directly\n\
             4. For complex requests, hand off to the planning system\n\n\
             If the request needs resume analysis, job search, cover letters, interview preparation, \
             salary analysis or a multi-part report, include the phrase \"{}\" in your response to trigger the planning process.\n\
             For simple informational questions, respond directly without handoff.",
            HANDOFF_TO_PLANNER
        ),
        NodeKind::Planner => {
            let research = if state.options.search_before_planning {
                "\nStart the plan with a job_search_agent research step when the request depends on current market information."
            } else {
                ""
            };
            let depth = if state.options.deep_thinking_mode {
                "\nThink through dependencies between steps carefully before answering."
            } else {
                ""
            };
            format!(
                "You are a career planning agent responsible for creating structured execution plans.\n\n\
                 Analyze the user's request and decide which team members need to be involved and in what order.\n\n\
                 Available team members:\n{}\n\n\
                 Your response must be a single valid JSON object with this structure:\n\
                 {{\n  \"plan_name\": \"Brief name describing the plan\",\n  \"tasks\": [\n    {{\"name\": \"Analyze the resume against job requirements\", \"agent\": \"resume_agent\"}}\n  ]\n}}\n\
                 Always finish with a reporter task. Do not add any text outside the JSON object.{}{}",
                format_team_members(),
                research,
                depth
            )
        }
        NodeKind::Supervisor => format!(
            "You are the supervisor agent responsible for orchestrating the workflow.\n\n\
             Decide which team member should act next based on the plan and the responses so far.\n\n\
             Available team members:\n{}\n\n\
             Previous responses from team members are provided in the format:\n\
             \"Response from [agent_name]:\n\n<response>\n[content]\n</response>\n\n*Please execute the next step.*\"\n\n\
             If all necessary steps are complete, choose \"FINISH\". Route to the reporter once the \
             required work is done so it can write the final report.",
            format_team_members()
        ),
        NodeKind::Member(member) => member_prompt(member),
    }
}

fn member_prompt(member: TeamMember) -> String {
    let (role, duties) = match member {
        TeamMember::ResumeAgent => (
            "a resume specialist that analyzes and optimizes resumes",
            "1. Analyze resumes against job descriptions\n2. Identify strengths and weaknesses\n3. Suggest specific improvements\n4. Generate optimized content",
        ),
        TeamMember::JobSearchAgent => (
            "a job search specialist that finds relevant job listings",
            "1. Search for jobs matching user criteria\n2. Filter and rank job listings\n3. Analyze job requirements against user skills\n4. Provide context about job market trends",
        ),
        TeamMember::ApplicationAgent => (
            "an application specialist that helps with job applications",
            "1. Generate customized cover letters\n2. Track application status\n3. Suggest follow-up strategies\n4. Provide application feedback",
        ),
        TeamMember::InterviewAgent => (
            "an interview coach",
            "1. Prepare mock interview questions\n2. Provide feedback on answers\n3. Offer interview strategy advice\n4. Analyze job requirements for interview preparation",
        ),
        TeamMember::SalaryAgent => (
            "a compensation and negotiation specialist",
            "1. Estimate market compensation\n2. Analyze offer packages\n3. Provide negotiation strategies\n4. Compare compensation across industries and locations",
        ),
        TeamMember::Reporter => {
            return "You are a career report specialist.\n\n\
                    Analyze all the information collected so far and create a comprehensive report with:\n\
                    1. Summary of the situation\n2. Key findings and insights\n3. Specific recommendations\n4. Clear action items\n\n\
                    Format the report in a professional, easy-to-read style with Markdown."
                .to_string();
        }
    };

    format!(
        "You are {}.\n\nYour responsibilities:\n{}\n\n\
         Respond with your findings, then end with these lines:\n\
         Completion: <0-100>%\n\
         Contribution: <one sentence describing what you contributed>",
        role, duties
    )
}

fn run_context(state: &WorkflowState) -> Option<String> {
    let mut sections = Vec::new();
    if !state.options.user_profile.is_empty() {
        sections.push(format!(
            "User profile:\n{}",
            serde_json::Value::Object(state.options.user_profile.clone())
        ));
    }
    if !state.options.document_context.is_empty() {
        sections.push(format!(
            "Documents:\n{}",
            serde_json::Value::Object(state.options.document_context.clone())
        ));
    }
    (!sections.is_empty()).then(|| sections.join("\n\n"))
}

fn progress_summary(state: &WorkflowState) -> String {
    let mut summary = format!(
        "Delegations so far: {}\nOverall completion: {}%",
        state.recursion_count, state.overall_completion
    );

    if !state.task_registry.is_empty() {
        summary.push_str("\nTasks:");
        for task in &state.task_registry {
            let status = match task.status {
                TaskStatus::Pending => "pending",
                TaskStatus::InProgress => "in_progress",
                TaskStatus::Completed => "completed",
                TaskStatus::Blocked => "blocked",
            };
            summary.push_str(&format!("\n- [{}] {} ({})", status, task.name, task.assigned_to));
        }
    }
    if !state.task_notes.is_empty() {
        summary.push_str("\nNotes:\n");
        summary.push_str(&state.task_notes);
    }
    summary
}
