use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use tracing::warn;

use storefront_core::models::{RegisterData, UserProfile};
use storefront_core::utils::{format_date, format_optional};
use storefront_core::ProfileLoad;

use super::{describe, user_error, App};

pub struct RegisterArgs {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: String,
    pub address: String,
}

fn prompt_line(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) => print!("{} [{}]: ", label, default),
        None => print!("{}: ", label),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read input")?;
    let line = line.trim();

    match (line.is_empty(), default) {
        (true, Some(default)) => Ok(default.to_string()),
        _ => Ok(line.to_string()),
    }
}

fn prompt_password(label: &str) -> Result<String> {
    rpassword::prompt_password(format!("{}: ", label)).context("Failed to read password")
}

fn print_profile(profile: &UserProfile) {
    println!("{} (@{})", profile.display_name(), profile.username);
    println!("  Email:      {}", profile.email);
    let birth_date = profile
        .birth_date
        .as_deref()
        .map(format_date)
        .unwrap_or_else(|| "-".to_string());
    println!("  Birth date: {}", birth_date);
    println!("  Address:    {}", format_optional(&profile.address, "-"));
}

pub async fn login(app: &mut App, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt_line("Email", app.config.last_email.as_deref())?,
    };
    if email.is_empty() {
        bail!("Email is required");
    }
    let password = prompt_password("Password")?;

    let profile = app
        .session
        .login(&email, &password)
        .await
        .map_err(user_error)?;

    app.config.last_email = Some(email);
    if let Err(e) = app.config.save() {
        warn!(error = %e, "Failed to remember login email");
    }

    println!("Welcome, {}!", profile.display_name());
    print_profile(&profile);
    Ok(())
}

pub async fn register(app: &App, args: RegisterArgs) -> Result<()> {
    let password = prompt_password("Password")?;
    let confirmation = prompt_password("Confirm password")?;
    if password != confirmation {
        bail!("Passwords do not match");
    }

    let data = RegisterData {
        username: args.username,
        first_name: args.first_name,
        last_name: args.last_name,
        birth_date: args.birth_date,
        email: args.email,
        password,
        address: args.address,
    };
    let email = data.email.clone();

    app.session.register(data).await.map_err(user_error)?;

    println!("Account created. Log in with: storefront login --email {}", email);
    Ok(())
}

pub async fn profile(app: &App, json: bool) -> Result<()> {
    let outcome = app.session.load_profile().await;
    if let Some(notification) = outcome.notification() {
        eprintln!("{}", describe(&notification));
    }

    match outcome {
        ProfileLoad::Cached(profile) | ProfileLoad::Loaded(profile) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&profile)?);
            } else {
                print_profile(&profile);
            }
            Ok(())
        }
        ProfileLoad::Anonymous | ProfileLoad::SessionExpired => {
            bail!("Not logged in. Run `storefront login` first.")
        }
    }
}

pub async fn logout(app: &App) -> Result<()> {
    if !app.session.credentials().is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }

    if !app.session.logout().await {
        warn!("Backend did not confirm the logout");
    }
    println!("Logged out.");
    Ok(())
}

pub fn status(app: &App) -> Result<()> {
    let state = app.session.credentials().snapshot();
    if state.is_authenticated {
        match (&state.user, &app.config.last_email) {
            (Some(user), _) => println!("Logged in as {}", user.username),
            (None, Some(email)) => println!("Logged in ({})", email),
            (None, None) => println!("Logged in"),
        }
    } else {
        println!("Not logged in");
    }

    println!("Backend:  {}", app.session.api().base_url());

    let ages = app.cache.get_cache_ages();
    println!("Products: cached {}", ages.products_age());
    match app.cache.load_cart() {
        Ok(cart) => println!("Cart:     {} item(s), saved {}", cart.item_count(), ages.cart_age()),
        Err(e) => {
            warn!(error = %e, "Failed to read saved cart");
            println!("Cart:     unreadable");
        }
    }
    Ok(())
}
