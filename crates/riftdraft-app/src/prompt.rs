// Prompt templates and response schemas for every AI-backed feature.
//
// Prompts carry the board as plain text so the model reasons over the same
// view the user sees. Each prompt is paired with a JSON schema that is sent
// as the structured-output hint.

use chrono::NaiveDate;
use riftdraft_draft::{ChampionRef, DraftSlot, DraftState, Role, Side, Turn};
use serde_json::{json, Value};

use crate::opponent::Persona;

// ---------------------------------------------------------------------------
// System prompt
// ---------------------------------------------------------------------------

pub fn system_prompt() -> String {
    "You are a League of Legends draft analyst.\n\
     Drafts are 5v5: each side bans 5 and picks 5 champions in a fixed order.\n\
     Judge team compositions on engage, peel, damage profile (AD/AP mix), \
     scaling, lane matchups and win conditions.\n\
     Always answer with a single JSON object matching the requested schema \
     and nothing else."
        .to_string()
}

// ---------------------------------------------------------------------------
// Board rendering
// ---------------------------------------------------------------------------

fn slot_name(slot: &DraftSlot) -> &str {
    slot.occupant.as_ref().map_or("(empty)", |c| c.name.as_str())
}

/// Render both teams, one line per slot.
pub fn format_board(state: &DraftState) -> String {
    let mut out = String::new();
    for side in [Side::Blue, Side::Red] {
        let team = state.team(side);
        let label = match side {
            Side::Blue => "BLUE",
            Side::Red => "RED",
        };
        out.push_str(&format!("{label} SIDE\n"));

        let bans: Vec<&str> = team.bans.iter().map(slot_name).collect();
        out.push_str(&format!("  Bans: {}\n", bans.join(", ")));

        for (slot, role) in team.picks.iter().zip(Role::ALL) {
            out.push_str(&format!("  {}: {}\n", role.as_str(), slot_name(slot)));
        }
    }
    out
}

fn format_names(champions: &[ChampionRef]) -> String {
    champions
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Bot turn
// ---------------------------------------------------------------------------

pub fn bot_turn_prompt(
    state: &DraftState,
    turn: Turn,
    persona: Persona,
    available: &[ChampionRef],
    top_tier: &[String],
) -> String {
    let mut prompt = format!(
        "You are drafting for the {side} side as the \"{name}\" persona: {desc}\n\n\
         CURRENT DRAFT\n{board}\n\
         YOUR ACTION: {turn}\n",
        side = turn.side,
        name = persona.as_str(),
        desc = persona.description(),
        board = format_board(state),
    );
    if !top_tier.is_empty() {
        prompt.push_str(&format!(
            "\nCurrent top-tier champions: {}\n",
            top_tier.join(", ")
        ));
    }
    prompt.push_str(&format!(
        "\nAVAILABLE CHAMPIONS (choose exactly one of these): {}\n\n\
         Respond with {{\"champion\": <name>, \"reasoning\": <one or two sentences>}}.",
        format_names(available)
    ));
    prompt
}

pub fn bot_turn_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "champion": { "type": "string" },
            "reasoning": { "type": "string" }
        },
        "required": ["champion", "reasoning"]
    })
}

// ---------------------------------------------------------------------------
// Live analysis
// ---------------------------------------------------------------------------

pub fn analysis_prompt(state: &DraftState, user_side: Side, next_turn: Option<Turn>) -> String {
    let next = match next_turn {
        Some(turn) => format!("Next action: {turn}."),
        None => "The draft is complete.".to_string(),
    };
    format!(
        "Analyse this draft in progress. The user is on the {user_side} side.\n\n\
         {board}\n{next}\n\n\
         Grade each side's draft so far (S, A+, A, A-, B+, B, B-, C+, C, C-, D+, D, D-, F), \
         summarise the state of the draft in two or three sentences, and suggest up to \
         three champions the user's side should consider next, each with a short reason.",
        board = format_board(state),
    )
}

pub fn analysis_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "blue_grade": { "type": "string" },
            "red_grade": { "type": "string" },
            "summary": { "type": "string" },
            "suggestions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "champion": { "type": "string" },
                        "reason": { "type": "string" }
                    },
                    "required": ["champion", "reason"]
                }
            }
        },
        "required": ["blue_grade", "red_grade", "summary", "suggestions"]
    })
}

// ---------------------------------------------------------------------------
// Arena scoring
// ---------------------------------------------------------------------------

pub fn score_prompt(state: &DraftState) -> String {
    format!(
        "Score this completed draft.\n\n{board}\n\
         Give each side a letter grade (S, A+, A, A-, B+, B, B-, C+, C, C-, D+, D, D-, F) \
         and a one-paragraph verdict explaining which composition is favoured and why.",
        board = format_board(state),
    )
}

pub fn score_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "blue_grade": { "type": "string" },
            "red_grade": { "type": "string" },
            "commentary": { "type": "string" }
        },
        "required": ["blue_grade", "red_grade", "commentary"]
    })
}

// ---------------------------------------------------------------------------
// Daily insight
// ---------------------------------------------------------------------------

pub fn insight_prompt(date: NaiveDate, data_version: &str) -> String {
    format!(
        "Today is {date}. Give one practical drafting tip for patch {data_version}: \
         a short title and two or three sentences of advice."
    )
}

pub fn insight_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "title": { "type": "string" },
            "tip": { "type": "string" }
        },
        "required": ["title", "tip"]
    })
}
