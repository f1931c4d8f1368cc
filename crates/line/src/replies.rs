//! User-facing questionnaire wording.

use moldquote_core::domain::material::MaterialPriceTable;
use moldquote_core::domain::session::Session;
use moldquote_core::estimate::{format_amount, CostEstimate};
use moldquote_core::flows::{FlowAction, FlowTransitionError};
use moldquote_core::sinks::SinkReport;

use crate::messages::LineMessage;

pub const SIZE_PROMPT: &str = "กรุณากรอกขนาดชิ้นงาน (กว้างxยาวxสูง) cm\nตัวอย่าง: 10.5x4.5x3";
pub const QUANTITY_PROMPT: &str = "กรุณากรอกจำนวนที่ต้องการผลิต (ตัวเลข)";
pub const INVALID_QUANTITY: &str = "❌ กรุณากรอกจำนวนที่ถูกต้อง เช่น 100";
pub const INVALID_SIZE: &str = "❌ ขนาดชิ้นงานไม่ถูกต้อง\nโปรดใช้รูปแบบ เช่น 10.5x4.5x3";
pub const CONTACT_PROMPT: &str =
    "กรุณากรอกข้อมูลส่วนตัวของคุณ\nรูปแบบ: ชื่อ-สกุล, เบอร์โทร, ชื่อบริษัท, อีเมล";
pub const INVALID_CONTACT: &str =
    "❌ กรุณากรอกข้อมูลส่วนตัวให้ครบถ้วนในรูปแบบ:\nชื่อ-สกุล, เบอร์โทร, ชื่อบริษัท, อีเมล";
pub const DECLINE_ACK: &str = "ไม่ได้เลือกใบเสนอราคา\nหากต้องการใบเสนอราคา 'กรุณาทำรายการ' ใหม่";
pub const SUBMISSION_SUCCESS: &str =
    "🎉 ข้อมูลครบถ้วนแล้ว\nใบเสนอราคาจะส่งให้ทางอีเมลที่ระบุ\n(ภายใน 2-3 วันทำการ)";
pub const NO_SESSION_NOTICE: &str = "⚠️ กรุณาเริ่มคำนวณโดยพิมพ์ 'เริ่มคำนวณ'";

pub fn start_prompt(prices: &MaterialPriceTable) -> LineMessage {
    LineMessage::text(format!(
        "✨ เริ่มต้นการคำนวณต้นทุน ✨\n\nกรุณาเลือกวัสดุที่ต้องการผลิต:\n{}",
        prices.display_list()
    ))
}

pub fn no_session_notice() -> LineMessage {
    LineMessage::text(NO_SESSION_NOTICE)
}

/// Summary shown when the questionnaire reaches the quote decision.
pub fn estimate_summary(session: &Session, estimate: &CostEstimate) -> String {
    let material = session.material.as_ref().map(|m| m.as_str()).unwrap_or_default();
    let size = session.size.as_deref().unwrap_or_default();
    let quantity = session.quantity.unwrap_or_default();

    format!(
        "✨ คำนวณต้นทุนสำเร็จ ✨\n\n\
         วัสดุ: {material}\n\
         ขนาด: {size} cm³\n\
         ปริมาตร: {volume} cm³\n\
         น้ำหนัก: {weight} kg\n\
         จำนวน: {quantity} ชิ้น\n\
         ต้นทุนรวม: {total}\n\n\
         ✅ ข้อมูลครบถ้วนแล้ว\n\
         ต้องการใบเสนอราคาหรือไม่?\n\
         หากต้องการให้พิมพ์ 'ต้องการ'",
        volume = estimate.display_volume(),
        weight = estimate.display_weight(),
        total = estimate.display_total(),
    )
}

/// Reply for one engine action. `session` must already reflect the
/// transition; `PersistQuote` has no reply of its own because the
/// acknowledgement depends on the sinks.
pub fn reply_for_action(
    action: &FlowAction,
    session: &Session,
    prices: &MaterialPriceTable,
) -> Option<LineMessage> {
    let text = match action {
        FlowAction::PromptMaterial => return Some(start_prompt(prices)),
        FlowAction::PromptSize => SIZE_PROMPT.to_owned(),
        FlowAction::PromptQuantity => QUANTITY_PROMPT.to_owned(),
        FlowAction::PromptSizeReentry => INVALID_SIZE.to_owned(),
        FlowAction::PresentEstimate(estimate) => estimate_summary(session, estimate),
        FlowAction::PromptContact => CONTACT_PROMPT.to_owned(),
        FlowAction::AcknowledgeDecline => DECLINE_ACK.to_owned(),
        FlowAction::PersistQuote(_) => return None,
    };
    Some(LineMessage::text(text))
}

pub fn reply_for_error(error: &FlowTransitionError) -> LineMessage {
    match error {
        FlowTransitionError::UnknownMaterial { available, .. } => {
            LineMessage::text(format!("❌ วัสดุไม่ถูกต้อง กรุณาเลือกจาก:\n{available}"))
        }
        FlowTransitionError::MalformedSize { .. } => LineMessage::text(INVALID_SIZE),
        FlowTransitionError::InvalidQuantity { .. } => LineMessage::text(INVALID_QUANTITY),
        FlowTransitionError::QuantityTooLarge { max, .. } => LineMessage::text(format!(
            "❌ จำนวนมากเกินไป กรุณากรอกไม่เกิน {}",
            format_amount(f64::from(*max)).trim_end_matches(".00")
        )),
        FlowTransitionError::MalformedContact { .. } => LineMessage::text(INVALID_CONTACT),
        FlowTransitionError::IncompleteSession { .. } => no_session_notice(),
    }
}

pub fn submission_reply(report: &SinkReport) -> LineMessage {
    match report.failure_summary() {
        None => LineMessage::text(SUBMISSION_SUCCESS),
        Some(summary) => LineMessage::text(format!(
            "⚠️ เกิดข้อผิดพลาดในการบันทึกข้อมูลลง Google Sheets/BigQuery: {summary}"
        )),
    }
}
