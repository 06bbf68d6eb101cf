//! User-facing texts and keyboards
//!
//! All replies are Uzbek HTML markup, kept here so handlers stay readable.

use crate::messenger::{InlineButton, InlineKeyboard};
use crate::models::{CallbackIntent, DuaSlots, PrayerName, PrayerTimings, Region, Sender};
use crate::services::region_service::RegionService;

pub const UNKNOWN_REGION: &str = "❌ Noto'g'ri hudud tanlandi.";
pub const UNKNOWN_DUA_TIME: &str = "❌ Noto'g'ri vaqt tanlandi.";
pub const PRAYER_TIMES_FAILED: &str = "⚠️ Namoz vaqtlarini olishda xatolik yuz berdi.";
pub const DUA_TIME_SAVE_FAILED: &str = "❌ Dua vaqtini saqlashda xatolik yuz berdi.";

pub const REGION_PROMPT: &str =
    "🌏<b>Iltimos, hududingizni tanlang va tanlangan mintaqa bo'yicha sizga namoz vaqtlarini aytib turamiz:</b>";
pub const DUA_TIME_PROMPT: &str = "<b>Har kuni sizga kundalik duolar va manfaatli hikmatlar yuboriladi, \
     ularni sizga qaysi vaqtda yuborishimizni xohlaysiz?</b>";

pub const FEEDBACK_PROMPT: &str = "<b>✍️ Iltimos, fikr yoki savolingizni matn shaklida yozib yuboring:</b>\n\n\
     <b>Rasm | Video | Ovozli xabar | Fayl </b>\nqabul qilinmaydi va adminga yuborilmaydi!";
pub const FEEDBACK_TOO_SHORT: &str = "❗️ Iltimos, fikr yoki savolingizni to‘liqroq yozing.";
pub const FEEDBACK_RECEIVED: &str = "✅ Fikringiz adminga yuborildi. Rahmat!";

pub const DUA_CONTENT_PROMPT: &str = "📩 Iltimos, duo matnini yuboring.\n\
     Agar rasm bo‘lsa, oldin uni yuboring, keyin esa matnni alohida yuboring.\n\n\
     <i>(Rasm ixtiyoriy, faqat matn ham bo‘lishi mumkin)</i>";
pub const DUA_IMAGE_STAGED: &str = "📝 Endi esa dua matnini yuboring (HTML formatda).";
pub const DUA_SAVED: &str = "✅ Dua muvaffaqiyatli saqlandi.";
pub const DUA_SAVE_FAILED: &str = "❌ Dua saqlashda xatolik yuz berdi.";

pub const BROADCAST_PROMPT: &str = "📨 E’lon matni, rasm, video yoki audio yuboring.";
pub const BROADCAST_FAILED: &str = "❌ E’lon yuborishda xatolik yuz berdi.";

/// Escapes the characters Telegram's HTML parse mode treats as markup
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn user_link(sender: &Sender) -> String {
    let name = sender.name.as_deref().unwrap_or("Foydalanuvchi");
    format!("<a href=\"tg://user?id={}\">{}</a>", sender.id, escape_html(name))
}

pub fn main_menu() -> InlineKeyboard {
    InlineKeyboard::new()
        .row(vec![InlineButton::new("Namoz vaqtlari", &CallbackIntent::PrayTimes)])
        .row(vec![InlineButton::new("Kundalik duolar", &CallbackIntent::DuaMenu)])
        .row(vec![InlineButton::new("Manbalar jamlanmasi", &CallbackIntent::Library)])
}

pub fn admin_menu() -> InlineKeyboard {
    InlineKeyboard::new()
        .row(vec![InlineButton::new("📥 Duolar qo‘shish", &CallbackIntent::AdminAddDua)])
        .row(vec![InlineButton::new("📢 E’lon berish", &CallbackIntent::AdminBroadcast)])
}

pub fn region_menu(regions: &RegionService) -> InlineKeyboard {
    let buttons = regions
        .regions()
        .iter()
        .map(|region| InlineButton::new(region.label.clone(), &CallbackIntent::SelectRegion(region.key.clone())))
        .collect();
    InlineKeyboard::grid(buttons, 3)
}

pub fn dua_time_menu(slots: &DuaSlots) -> InlineKeyboard {
    let buttons = slots
        .iter()
        .map(|slot| InlineButton::new(slot.to_string(), &CallbackIntent::SelectDuaTime(slot.to_string())))
        .collect();
    InlineKeyboard::grid(buttons, 2)
}

pub fn library_menu() -> InlineKeyboard {
    InlineKeyboard::new().row(vec![InlineButton::new("Fikr bildirish", &CallbackIntent::SendFeedback)])
}

pub fn greeting(sender: &Sender) -> String {
    format!("<b>Assalomu alaykum {}</b>", user_link(sender))
}

pub fn library(bot_username: Option<&str>) -> String {
    let heading = match bot_username {
        Some(username) => format!("<b>@{username} manbalari:</b>"),
        None => "<b>Manbalar:</b>".to_string(),
    };
    format!(
        "{heading}\n<blockquote><b>@islomuz</b>\n<b>@muslimuzportal</b>\n<b>@HilolNashr</b></blockquote>\n\
         <b>Shiorimiz</b>:\n<blockquote><b>Ahli sunna va jamoa mazhabi asosida pok aqiyda va musaffo Islomga intilish, \
         Qur'on va sunnatni o'rganib amal qilish, islomiy ma'rifat taratish, salafi solih - ulug' mujtahidlarga ergashish, \
         kengbag'irlik va birodarlik ruhini tarqatish, diniy savodsizlikni tugatish, ixtilof va firqachilikka barham berish, \
         mutaassiblik va bid'at-xurofotlarni yo'qotish</b></blockquote>"
    )
}

pub fn prayer_times(region: &Region, date_label: &str, timings: &PrayerTimings) -> String {
    let mut text = format!(
        "📍 <b>Hudud:</b> {}\n🗓 <b>Sana:</b> {}\n\n🕌 <b>Namoz vaqtlari</b>:",
        region.label,
        escape_html(date_label)
    );
    for prayer in PrayerName::all() {
        let time = timings.raw(prayer).unwrap_or("-");
        text.push_str(&format!("\n- {}: {}", prayer.display_name(), escape_html(time)));
    }
    text
}

pub fn region_saved(label: &str) -> String {
    format!("✅ Hududingiz ({label}) saqlandi. Namoz vaqtlari kirganda eslatamiz.")
}

pub fn dua_time_saved(slot: &str) -> String {
    format!("<b>InshaAlloh duolar har kuni <i>{slot}</i> da yuboriladi.</b>")
}

pub fn feedback_forward(text: &str, sender: &Sender) -> String {
    format!(
        "📩 <b>Yangi fikr:</b>\n\n{}\n\n👤 <b>Foydalanuvchi:</b> {} (@{})",
        escape_html(text),
        user_link(sender),
        sender.username.as_deref().unwrap_or("no-username")
    )
}

/// Admin statistics: total, per region label, per dua slot
pub fn statistics(total: usize, by_region: &[(String, usize)], by_slot: &[(String, usize)]) -> String {
    let render = |rows: &[(String, usize)]| {
        if rows.is_empty() {
            "Mavjud emas".to_string()
        } else {
            rows.iter()
                .map(|(label, count)| format!("- {label}: {count} ta"))
                .collect::<Vec<_>>()
                .join("\n")
        }
    };
    format!(
        "📊 <b>Statistika</b>:\n👤 Foydalanuvchilar soni: {total}\n\n\
         🌍 <b>Regionlar bo‘yicha:</b>\n{}\n\n\
         🕓 <b>Duolar vaqti bo‘yicha:</b>\n{}",
        render(by_region),
        render(by_slot)
    )
}
