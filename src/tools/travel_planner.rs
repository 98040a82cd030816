//! Travel planner tool - asks the model, in a travel-agent persona, to plan
//! the trip described by the query

use super::{Tool, ToolContext, ToolOutput};
use crate::llm::{LlmMessage, LlmRequest};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const SYSTEM_PROMPT: &str = "\
You are a travel agent that plans trips for users entirely.
You help users plan trips by providing detailed itineraries, flight options, accommodation recommendations,
and activities based on their preferences and budget.

Your process should be:
1. First, understand the basic travel request (destinations, dates if provided)
2. Ask the user about their specific activity interests and preferences
3. Only after receiving their preferences, create a complete itinerary including:
   - Flight options and travel time
   - Accommodation options
   - Must-see attractions and activities tailored to their interests
   - Estimated budget

Always ask for activity preferences before providing the final itinerary.
";

pub struct TravelPlannerTool;

#[derive(Debug, Deserialize)]
struct TravelPlannerInput {
    query: String,
}

impl TravelPlannerTool {
    fn request(query: String) -> LlmRequest {
        LlmRequest {
            system: Some(SYSTEM_PROMPT.to_string()),
            messages: vec![LlmMessage::user(query)],
            tools: Vec::new(),
            max_tokens: None,
            temperature: Some(0.0),
        }
    }
}

#[async_trait]
impl Tool for TravelPlannerTool {
    fn name(&self) -> &'static str {
        "travel_planner"
    }

    fn description(&self) -> String {
        "Plan a trip based on user's requirements. Always ask for activity preferences before providing the final itinerary.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The user's travel query"
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> ToolOutput {
        let input = match serde_json::from_value::<TravelPlannerInput>(input) {
            Ok(input) if !input.query.trim().is_empty() => input,
            Ok(_) => return ToolOutput::error("Invalid input: query must not be empty"),
            Err(e) => return ToolOutput::error(format!("Invalid input: {e}")),
        };

        let request = Self::request(input.query);
        let result = tokio::select! {
            result = ctx.llm().complete(&request) => result,
            () = ctx.cancel.cancelled() => {
                return ToolOutput::error("[travel planning cancelled]");
            }
        };

        match result {
            Ok(response) => ToolOutput::success(response.text()),
            Err(e) => {
                tracing::warn!(
                    conv_id = %ctx.conversation_id,
                    error = %e,
                    "travel_planner LLM call failed"
                );
                ToolOutput::error(format!("Travel planning failed: {e}"))
            }
        }
    }
}
