use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use uuid::Uuid;

use super::access_tokens::TokenDefinition;
use super::models::{AccessToken, User, SUPERUSER_ROLE};
use super::service::CreateUser;
use crate::bootstrap::Services;
use crate::command_registry::CommandModule;
use crate::conf::AppConfig;
use crate::error::{AppError, AppResult};

/// 用户模块的命令处理器
pub struct UsersCommands;

fn parse_uuid(s: &str) -> Result<Uuid, String> {
    Uuid::parse_str(s).map_err(|e| format!("invalid user id '{}': {}", s, e))
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> AppResult<&'a String> {
    matches
        .get_one::<String>(id)
        .ok_or_else(|| AppError::validation(id, "is required"))
}

/// 令牌只在此处展示一次
pub fn render_token(token: &AccessToken) -> String {
    let mut out = format!(
        "ID:        {}\nRaw token: {}\nHash:      {}\n",
        token.id,
        token.secret.as_deref().unwrap_or(""),
        token.secret_hash
    );
    match token.expire_at {
        Some(at) => out.push_str(&format!("Expires:   {}\n", at.to_rfc3339())),
        None => out.push_str("WARNING: this token never expires\n"),
    }
    out
}

pub fn render_user(user: &User) -> String {
    format!(
        "ID:         {}\nEmail:      {}\nFirst name: {}\nLast name:  {}\n",
        user.id, user.email, user.first_name, user.last_name
    )
}

#[async_trait]
impl CommandModule for UsersCommands {
    fn module_name(&self) -> &'static str {
        "users"
    }

    fn register_commands(&self) -> Vec<Command> {
        vec![
            Command::new("tokens")
                .about("访问令牌管理 / manage access tokens")
                .subcommand_required(true)
                .subcommand(
                    Command::new("generate")
                        .about("为用户生成访问令牌 / generate an access token for a user")
                        .arg(
                            Arg::new("user")
                                .short('u')
                                .long("user")
                                .value_name("UUID")
                                .help("令牌所属用户 ID")
                                .required(true)
                                .value_parser(parse_uuid),
                        )
                        .arg(
                            Arg::new("expire")
                                .short('e')
                                .long("expire")
                                .value_name("DAYS")
                                .help("有效天数，-1 表示永不过期")
                                .allow_hyphen_values(true)
                                .required(true)
                                .value_parser(clap::value_parser!(i64)),
                        ),
                ),
            Command::new("superusers")
                .about("超级用户管理 / manage superusers")
                .subcommand_required(true)
                .subcommand(
                    Command::new("create")
                        .about("创建超级用户 / create a superuser")
                        .arg(Arg::new("email").long("email").required(true))
                        .arg(Arg::new("first-name").long("first-name").required(true))
                        .arg(Arg::new("last-name").long("last-name").required(true))
                        .arg(Arg::new("password").long("password").required(true)),
                ),
        ]
    }

    async fn handle_command(
        &self,
        command_name: &str,
        matches: &ArgMatches,
        config: &AppConfig,
    ) -> AppResult<()> {
        match (command_name, matches.subcommand()) {
            ("tokens", Some(("generate", sub))) => {
                let user_id = *sub
                    .get_one::<Uuid>("user")
                    .ok_or_else(|| AppError::validation("user", "is required"))?;
                let expiry_days = *sub
                    .get_one::<i64>("expire")
                    .ok_or_else(|| AppError::validation("expire", "is required"))?;

                let services = Services::build(config).await?;
                let token = services
                    .access_tokens
                    .create(TokenDefinition {
                        expiry_days,
                        user_id,
                    })
                    .await?;
                print!("{}", render_token(&token));
            }
            ("superusers", Some(("create", sub))) => {
                let input = CreateUser {
                    email: required(sub, "email")?.clone(),
                    first_name: required(sub, "first-name")?.clone(),
                    last_name: required(sub, "last-name")?.clone(),
                    password: required(sub, "password")?.clone(),
                    roles: vec![SUPERUSER_ROLE.to_string()],
                };

                let services = Services::build(config).await?;
                let user = services.users.create(input).await?;
                print!("{}", render_user(&user));
            }
            (name, sub) => {
                let sub = sub.map(|(s, _)| s).unwrap_or("");
                return Err(AppError::not_found(format!("command '{} {}'", name, sub)));
            }
        }
        Ok(())
    }
}
