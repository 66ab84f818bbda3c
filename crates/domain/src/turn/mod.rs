//! Turn rules: everything that turns a normalized provider result into the
//! next game state.

mod diplomacy;
mod order;
mod outcome;
mod penalties;
mod reducer;
mod result;
mod territory;

pub use diplomacy::{
    accept_inbound, accept_replies, deliver_inbound, is_recognized_sender, mark_thread_read,
    send_player_message, thread_messages, threads, DeliveryReport, InboundRejection,
    OutgoingRejection, ThreadKey,
};
pub use order::PlayerOrder;
pub use outcome::{collapse_conditions, evaluate_outcome, Defeat, COLLAPSE_THRESHOLD};
pub use penalties::{auto_drift, nuclear_program_succeeded, PenaltySignals};
pub use reducer::{
    apply_turn, TurnReport, TurnTransition, DEFAULT_ALLIANCE_KIND, DEFAULT_ALLIANCE_NAME,
    ORDER_HEADLINE_MAX_CHARS,
};
pub use result::{
    AllianceAction, AllianceUpdate, DiplomaticReply, InboundMessage, InfrastructureUpdate,
    MapUpdate, NarrativeItem, TurnEffects, TurnFlags, TurnResult, FALLBACK_DESCRIPTION,
    FALLBACK_HEADLINE,
};
pub use territory::{resolve_map_updates, TerritoryOutcome};
