pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("discord token is not configured (set DISCORD_TOKEN)")]
    MissingToken,

    #[error("discord gateway: {0}")]
    Serenity(#[from] serenity::Error),
}
