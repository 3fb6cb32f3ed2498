use minijinja::{Environment, Template};
use once_cell::sync::Lazy;
use strum::{EnumIter, IntoEnumIterator};
use tracing::info;

static TEMPLATES_ENVIRONMENT: Lazy<Environment> = Lazy::new(|| {
    info!("Initializing templating engine environment.");
    let mut env = Environment::new();

    // Use strum to iterate over the variants of the enum.
    for template in MessageTemplate::iter() {
        env.add_template(template.name(), template.template())
            .unwrap();
    }

    info!("Templates loaded in templating engine environment.");

    env
});

#[derive(Debug, Clone, Copy, EnumIter)]
pub enum MessageTemplate {
    Help,
    Registered,
    Unregistered,
    Rank,
    Leaderboard,
    NoPlayers,
    AutoLeaderboardDisabled,
    LeaderboardDeleted,
    NoAutoLeaderboard,
    PlayerNotFound,
    RateLimited,
    Unavailable,
    Usage,
}

impl MessageTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            MessageTemplate::Help => "help.txt",
            MessageTemplate::Registered => "registered.txt",
            MessageTemplate::Unregistered => "unregistered.txt",
            MessageTemplate::Rank => "rank.txt",
            MessageTemplate::Leaderboard => "leaderboard.txt",
            MessageTemplate::NoPlayers => "no_players.txt",
            MessageTemplate::AutoLeaderboardDisabled => "auto_leaderboard_disabled.txt",
            MessageTemplate::LeaderboardDeleted => "leaderboard_deleted.txt",
            MessageTemplate::NoAutoLeaderboard => "no_auto_leaderboard.txt",
            MessageTemplate::PlayerNotFound => "player_not_found.txt",
            MessageTemplate::RateLimited => "rate_limited.txt",
            MessageTemplate::Unavailable => "unavailable.txt",
            MessageTemplate::Usage => "usage.txt",
        }
    }

    pub fn get(&self) -> Result<Template<'_, '_>, minijinja::Error> {
        TEMPLATES_ENVIRONMENT.get_template(self.name())
    }

    pub fn template(&self) -> &'static str {
        // \n\ at each code line end creates a line break at the proper position and discards further spaces in this line of code.
        // \x20 (hex; 32 in decimal) is an ASCII space and an indicator for the first space to be preserved in this line of the string.
        match self {
            MessageTemplate::Help => {
                "🗒️ Rank bot commands:\n\n\
                👉 ```!register Name#TAG [region]```\n\
                Adds your account to the server leaderboard.\n\
                👉 ```!unregister Name#TAG```\n\
                Removes an account from the server leaderboard.\n\
                👉 ```!rank Name#TAG [region]```\n\
                Live rank of any player.\n\
                👉 ```!leaderboard [region]```\n\
                Registered players ordered by rank.\n\
                👉 ```!auto-leaderboard on [region]``` / ```!auto-leaderboard off```\n\
                Posts a leaderboard that refreshes itself, or stops refreshing it.\n\
                👉 ```!delete-leaderboard```\n\
                Deletes the auto-refreshed leaderboard.\n\n\
                Regions: {{ regions }}. Default is `{{ default_region }}`."
            }
            MessageTemplate::Registered => {
                "✅ *{{ player }}* registered ({{ region }}). Current rank: *{{ tier }}*{% if rated %} ({{ rr }} RR){% endif %}"
            }
            MessageTemplate::Unregistered => {
                "{%- if found -%}
                    👋 *{{ player }}* removed from the leaderboard.
                {%- else -%}
                    🤷 *{{ player }}* is not registered on this server.
                {%- endif -%}"
            }
            MessageTemplate::Rank => {
                "🎯 *{{ player }}* ({{ region }})\n\
                    \x20 • Current: *{{ tier }}*{% if rated %} ({{ rr }} RR){% endif %}\n\
                    \x20 • Peak: *{{ peak_tier }}*{% if peak_rated %} ({{ peak_rr }} RR){% endif %}\
                {%- if leaderboard_rank %}\n\
                    \x20 • Leaderboard: #{{ leaderboard_rank }}\
                {%- endif %}"
            }
            MessageTemplate::Leaderboard => {
                "🏆 {{ '*Auto-updated* leaderboard' if auto else 'Leaderboard' }} for {{ region }} as of {{ timestamp }}:\n\
                ```{{ board }}```\
                {%- if more %}\n\
                    \x20 … and {{ more }} more\
                {%- endif %}\
                {%- if failed %}\n\
                    ⏳ {{ failed }} player{{ 's' if failed > 1 }} could not be fetched and will be retried.\
                {%- endif %}"
            }
            MessageTemplate::NoPlayers => {
                "📭 No registered players yet. Use `!register Name#TAG` to join the {{ region }} leaderboard."
            }
            MessageTemplate::AutoLeaderboardDisabled => {
                "⏹️ The leaderboard will no longer be refreshed."
            }
            MessageTemplate::LeaderboardDeleted => {
                "🗑️ Auto-updated leaderboard deleted."
            }
            MessageTemplate::NoAutoLeaderboard => {
                "🤷 There is no auto-updated leaderboard on this server."
            }
            MessageTemplate::PlayerNotFound => {
                "🔍 Player *{{ player }}* not found."
            }
            MessageTemplate::RateLimited => {
                "🐢 The rank API is rate limited, try again later."
            }
            MessageTemplate::Unavailable => {
                "😵 Could not reach the rank API, try again later."
            }
            MessageTemplate::Usage => {
                "❓ {{ reason }}\nUsage: `{{ usage }}`"
            }
        }
    }
}
