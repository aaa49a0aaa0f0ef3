/// Remove mentions of the bot (`<@id>` and the legacy `<@!id>`) and trim.
pub fn strip_bot_mention(text: &str, bot_user_id: Option<u64>) -> String {
    let Some(id) = bot_user_id else {
        return text.trim().to_string();
    };
    text.replace(&format!("<@{id}>"), "")
        .replace(&format!("<@!{id}>"), "")
        .trim()
        .to_string()
}
