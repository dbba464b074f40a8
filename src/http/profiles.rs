//! FFS profiles: wallets, storage configuration, and creating new ones.

use crate::http::error::HttpError;
use crate::http::{AppState, notice, pages};
use axum::Form;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::SignedCookieJar;
use ffsgate_workflow::{
    ConfigChange, ConfigForm, ConfigLoad, ConfigView, ProfileCreation, create_profile, list_wallets, load_config, save_config,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Serialize)]
struct WalletsPage {
    title: &'static str,
    notices: Vec<String>,
    has_wallets: bool,
    wallets: Vec<WalletRow>,
}

#[derive(Serialize)]
struct WalletRow {
    ffs: String,
    name: String,
    address: String,
    #[serde(rename = "type")]
    kind: String,
    balance: String,
}

#[derive(Serialize)]
struct ConfigPage {
    title: &'static str,
    notices: Vec<String>,
    /// False when the service could not be asked; only the profile list and
    /// the notices are shown then.
    loaded: bool,
    ffs: ProfileRow,
    editable: bool,
    wallet_address: String,
    config: ConfigFields,
    profiles: Vec<ProfileRow>,
}

#[derive(Default, Serialize)]
struct ProfileRow {
    id: String,
    is_default: bool,
}

#[derive(Default, Serialize)]
struct ConfigFields {
    hot_enabled: bool,
    allow_unfreeze: bool,
    add_timeout: i64,
    cold_enabled: bool,
    rep_factor: i64,
    deal_min_duration: i64,
    excluded_miners: String,
    trusted_miners: String,
    country_codes: String,
    renew_enabled: bool,
    renew_threshold: i64,
    // Templates cannot hold integers above `i64::MAX`.
    max_price: String,
    repairable: bool,
}

impl From<ConfigView> for ConfigFields {
    fn from(view: ConfigView) -> Self {
        Self {
            hot_enabled: view.hot_enabled,
            allow_unfreeze: view.allow_unfreeze,
            add_timeout: view.add_timeout,
            cold_enabled: view.cold_enabled,
            rep_factor: view.rep_factor,
            deal_min_duration: view.deal_min_duration,
            excluded_miners: view.excluded_miners,
            trusted_miners: view.trusted_miners,
            country_codes: view.country_codes,
            renew_enabled: view.renew_enabled,
            renew_threshold: view.renew_threshold,
            max_price: view.max_price.to_string(),
            repairable: view.repairable,
        }
    }
}

/// Fields of the configuration form as posted by the browser. Checkboxes are
/// only present when ticked, and number inputs may be left blank.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ConfigInput {
    make_default: Option<String>,
    hot_enabled: Option<String>,
    allow_unfreeze: Option<String>,
    add_timeout: String,
    cold_enabled: Option<String>,
    rep_factor: String,
    deal_min_duration: String,
    excluded_miners: String,
    trusted_miners: String,
    country_codes: String,
    renew_enabled: Option<String>,
    renew_threshold: String,
    max_price: String,
    repairable: Option<String>,
}

impl ConfigInput {
    /// Returns a notice for the user if a number does not parse.
    fn into_form(self) -> Result<ConfigForm, String> {
        Ok(ConfigForm {
            make_default: self.make_default.is_some(),
            hot_enabled: self.hot_enabled.is_some(),
            allow_unfreeze: self.allow_unfreeze.is_some(),
            add_timeout: number("Add timeout", &self.add_timeout)?,
            cold_enabled: self.cold_enabled.is_some(),
            rep_factor: number("Number of replications", &self.rep_factor)?,
            deal_min_duration: number("Duration of storage deal", &self.deal_min_duration)?,
            excluded_miners: self.excluded_miners,
            trusted_miners: self.trusted_miners,
            country_codes: self.country_codes,
            renew_enabled: self.renew_enabled.is_some(),
            renew_threshold: number("Deal renewal threshold", &self.renew_threshold)?,
            max_price: number("Maximum deal price", &self.max_price)?,
            repairable: self.repairable.is_some(),
        })
    }
}

fn number<T: FromStr + Default>(label: &str, value: &str) -> Result<T, String> {
    match value.trim() {
        "" => Ok(T::default()),
        value => value.parse().map_err(|_| format!("{label} must be a whole number, not \"{value}\".")),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct NewFfsInput {
    default: Option<String>,
}

pub(crate) async fn wallets(State(state): State<AppState>, jar: SignedCookieJar) -> Result<impl IntoResponse, HttpError> {
    let (jar, mut notices) = notice::take(jar);
    let listing = list_wallets(&state.ctx).await?;
    notices.extend(listing.notices);
    let wallets: Vec<WalletRow> = listing
        .wallets
        .into_iter()
        .map(|wallet| WalletRow {
            ffs: wallet.ffs_id,
            name: wallet.name,
            address: wallet.address,
            kind: wallet.kind,
            balance: wallet.balance.map(|b| b.to_string()).unwrap_or_else(|| "unknown".to_string()),
        })
        .collect();
    let page = WalletsPage { title: "Wallets", notices, has_wallets: !wallets.is_empty(), wallets };
    Ok((jar, state.pages.render(pages::WALLETS, &page)?))
}

/// Configuration of the default profile, which is created if missing.
pub(crate) async fn show_default(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> Result<impl IntoResponse, HttpError> {
    config_page(&state, jar, None).await
}

pub(crate) async fn show(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Path(ffs_id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    config_page(&state, jar, Some(&ffs_id)).await
}

async fn config_page(
    state: &AppState,
    jar: SignedCookieJar,
    ffs_id: Option<&str>,
) -> Result<(SignedCookieJar, Html<String>), HttpError> {
    let load = load_config(&state.ctx, ffs_id).await?;
    let (jar, mut notices) = notice::take(jar);
    let (ffs, view) = match load {
        ConfigLoad::Loaded { ffs, view } => (ffs, view),
        ConfigLoad::Failed(failure) => {
            notices.push(failure);
            return Ok((jar, unavailable_page(state, notices).await?));
        },
    };
    let wallet_address = view.wallet_address.clone().unwrap_or_default();
    let page = ConfigPage {
        title: "Configuration",
        notices,
        loaded: true,
        ffs: ProfileRow { id: ffs.ffs_id, is_default: ffs.is_default },
        editable: !wallet_address.is_empty(),
        wallet_address,
        config: view.into(),
        profiles: profile_rows(state).await?,
    };
    Ok((jar, state.pages.render(pages::CONFIG, &page)?))
}

/// The configuration page when there is no configuration to show.
async fn unavailable_page(state: &AppState, notices: Vec<String>) -> Result<Html<String>, HttpError> {
    let page = ConfigPage {
        title: "Configuration",
        notices,
        loaded: false,
        ffs: ProfileRow::default(),
        editable: false,
        wallet_address: String::new(),
        config: ConfigFields::default(),
        profiles: profile_rows(state).await?,
    };
    Ok(state.pages.render(pages::CONFIG, &page)?)
}

async fn profile_rows(state: &AppState) -> Result<Vec<ProfileRow>, HttpError> {
    let profiles = state.ctx.store().list_ffs().await?;
    Ok(profiles.into_iter().map(|f| ProfileRow { id: f.ffs_id, is_default: f.is_default }).collect())
}

pub(crate) async fn new_ffs(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Form(input): Form<NewFfsInput>,
) -> Result<Response, HttpError> {
    match create_profile(&state.ctx, input.default.is_some()).await? {
        ProfileCreation::Created(ffs) => Ok(Redirect::to(&format!("/config/{}", ffs.ffs_id)).into_response()),
        ProfileCreation::Failed(failure) => {
            let (jar, mut notices) = notice::take(jar);
            notices.push(failure);
            Ok((jar, unavailable_page(&state, notices).await?).into_response())
        },
    }
}

pub(crate) async fn change_config(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Path((ffs_id, wallet)): Path<(String, String)>,
    Form(input): Form<ConfigInput>,
) -> Result<impl IntoResponse, HttpError> {
    // Only a known profile is redirected to.
    let Some(ffs) = state.ctx.store().ffs_by_ffs_id(&ffs_id).await? else {
        return Err(HttpError::new(StatusCode::NOT_FOUND, format!("FFS {ffs_id} not found")));
    };
    let notices = match input.into_form() {
        Ok(form) => match save_config(&state.ctx, &ffs.ffs_id, &wallet, form).await? {
            ConfigChange::Applied => vec![],
            ConfigChange::Failed(notice) => vec![notice],
        },
        Err(notice) => vec![notice],
    };
    Ok((notice::push(jar, &notices), Redirect::to(&format!("/config/{}", ffs.ffs_id))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::{TestApp, body_text};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use ffsgate_powergate::{ColdConfig, FilecoinConfig, MockPowergate, StorageConfig};
    use rstest::rstest;

    fn with_wallet() -> MockPowergate {
        MockPowergate::default().with_config(StorageConfig {
            cold: Some(ColdConfig {
                enabled: Some(true),
                filecoin: Some(FilecoinConfig {
                    rep_factor: Some(2),
                    addr: Some("f3wallet".to_string()),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        })
    }

    fn post_form(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// The `name=value` part of the cookie a response sets, ready to send back.
    fn cookie_of(response: &axum::response::Response) -> String {
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    #[rstest]
    #[case("", Ok(0))]
    #[case(" 42 ", Ok(42))]
    #[case("-3", Ok(-3))]
    #[case("4.5", Err(()))]
    #[case("ten", Err(()))]
    fn test_number(#[case] input: &str, #[case] expected: Result<i64, ()>) {
        assert_eq!(number::<i64>("Field", input).map_err(|_| ()), expected);
    }

    #[test]
    fn test_checkboxes_are_presence() {
        let input = ConfigInput { hot_enabled: Some("y".to_string()), ..Default::default() };
        let form = input.into_form().unwrap();
        assert!(form.hot_enabled);
        assert!(!form.cold_enabled);
        assert!(!form.repairable);
    }

    #[tokio::test]
    async fn test_config_page_provisions_default() {
        let app = TestApp::with_mock(with_wallet()).await;
        let response = app.get("/config").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("FFS ffs-0001 (default)"));
        assert!(html.contains("/change_config/ffs-0001/f3wallet"));
        assert_eq!(app.mock.profiles_created(), 1);
        // A second visit finds the same profile.
        app.get("/config").await;
        assert_eq!(app.mock.profiles_created(), 1);
    }

    #[tokio::test]
    async fn test_config_without_wallet_is_read_only() {
        let app = TestApp::new().await;
        let html = body_text(app.get("/config").await).await;
        assert!(html.contains("cannot be edited here"));
        assert!(!html.contains("/change_config/"));
    }

    #[tokio::test]
    async fn test_unknown_profile() {
        let app = TestApp::new().await;
        assert_eq!(app.get("/config/ffs-9999").await.status(), StatusCode::NOT_FOUND);
        let response = app.send(post_form("/change_config/ffs-9999/f3wallet", "rep_factor=1")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_change_config_applies_and_redirects() {
        let app = TestApp::with_mock(with_wallet()).await;
        app.get("/config").await;
        let body = "cold_enabled=y&rep_factor=3&excluded_miners=f01%2Cf02&repairable=y&add_timeout=";
        let response = app.send(post_form("/change_config/ffs-0001/f3wallet", body)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/config/ffs-0001");

        let html = body_text(app.get("/config/ffs-0001").await).await;
        assert!(html.contains("name=\"rep_factor\" value=\"3\""));
        assert!(html.contains("value=\"f01,f02\""));
        let logs = app.ctx().store().list_logs().await.unwrap();
        assert_eq!(logs.last().unwrap().event, "Changed default configuration for FFS ffs-0001");
    }

    #[tokio::test]
    async fn test_refused_change_is_shown_after_redirect() {
        let app = TestApp::with_mock(with_wallet()).await;
        app.get("/config").await;
        app.mock.set_unreachable(true);
        let response = app.send(post_form("/change_config/ffs-0001/f3wallet", "rep_factor=3")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = cookie_of(&response);
        app.mock.set_unreachable(false);

        let request = Request::get("/config/ffs-0001").header(header::COOKIE, cookie).body(Body::empty()).unwrap();
        let html = body_text(app.send(request).await).await;
        assert!(html.contains("Configuration of FFS ffs-0001 could not be changed."));
        let logs = app.ctx().store().list_logs().await.unwrap();
        assert!(logs.last().unwrap().event.starts_with("Config change ERROR: FFS ffs-0001 "));
    }

    #[tokio::test]
    async fn test_invalid_number_changes_nothing() {
        let app = TestApp::with_mock(with_wallet()).await;
        app.get("/config").await;
        let response = app.send(post_form("/change_config/ffs-0001/f3wallet", "rep_factor=lots")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(response.headers().contains_key(header::SET_COOKIE));
        // Only the two provisioning events.
        assert_eq!(app.ctx().store().list_logs().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_new_default_ffs() {
        let app = TestApp::new().await;
        app.get("/config").await;
        let response = app.send(post_form("/new_ffs", "default=y")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/config/ffs-0002");
        let default = app.ctx().store().default_ffs().await.unwrap().unwrap();
        assert_eq!(default.ffs_id, "ffs-0002");
    }

    #[tokio::test]
    async fn test_new_ffs_without_default() {
        let app = TestApp::new().await;
        app.get("/config").await;
        let response = app.send(post_form("/new_ffs", "")).await;
        assert_eq!(response.headers()[header::LOCATION], "/config/ffs-0002");
        let default = app.ctx().store().default_ffs().await.unwrap().unwrap();
        assert_eq!(default.ffs_id, "ffs-0001");
    }

    #[tokio::test]
    async fn test_change_for_unknown_profile_with_bad_number() {
        let app = TestApp::new().await;
        let response = app.send(post_form("/change_config/a%0Ab/w", "rep_factor=lots")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!response.headers().contains_key(header::LOCATION));
    }

    #[tokio::test]
    async fn test_largest_max_price_renders() {
        let mock = MockPowergate::default().with_config(StorageConfig {
            cold: Some(ColdConfig {
                enabled: Some(true),
                filecoin: Some(FilecoinConfig {
                    max_price: Some(u64::MAX),
                    addr: Some("f3wallet".to_string()),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        });
        let app = TestApp::with_mock(mock).await;
        let response = app.get("/config").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("name=\"max_price\" min=\"0\" value=\"18446744073709551615\""));
    }

    #[tokio::test]
    async fn test_new_ffs_failure_is_shown_and_logged() {
        let app = TestApp::new().await;
        app.mock.set_unreachable(true);
        let response = app.send(post_form("/new_ffs", "default=y")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("A new Filecoin FileSystem could not be created."));
        assert!(!html.contains("/change_config/"));
        let logs = app.ctx().store().list_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].event.starts_with("Create FFS ERROR: "));
        assert!(app.ctx().store().list_ffs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_config_page_while_service_is_down() {
        let app = TestApp::new().await;
        app.mock.set_unreachable(true);
        let response = app.get("/config").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("A new Filecoin FileSystem could not be created."));
        assert!(html.contains("No configuration can be shown right now."));
        let logs = app.ctx().store().list_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert!(logs[0].event.starts_with("Create FFS ERROR: "));
    }

    #[tokio::test]
    async fn test_config_of_existing_profile_while_service_is_down() {
        let app = TestApp::new().await;
        app.get("/config").await;
        app.mock.set_unreachable(true);
        let response = app.get("/config/ffs-0001").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Configuration of FFS ffs-0001 could not be loaded."));
        // The profile list still lets the user move on.
        assert!(html.contains("href=\"/config/ffs-0001\""));
        let logs = app.ctx().store().list_logs().await.unwrap();
        assert_eq!(logs.len(), 3);
        assert!(logs[2].event.starts_with("Config ERROR: FFS ffs-0001 "));
    }

    #[tokio::test]
    async fn test_wallets_while_service_is_down() {
        let app = TestApp::new().await;
        app.get("/config").await;
        app.mock.set_unreachable(true);
        let response = app.get("/wallets").await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Wallets of FFS ffs-0001 could not be listed."));
        let logs = app.ctx().store().list_logs().await.unwrap();
        assert!(logs.last().unwrap().event.starts_with("Wallet ERROR: FFS ffs-0001 "));
    }

    #[tokio::test]
    async fn test_wallets_with_unknown_balance() {
        let app = TestApp::with_mock(MockPowergate::default().without_balance()).await;
        app.get("/config").await;
        let html = body_text(app.get("/wallets").await).await;
        assert!(html.contains("f3mockwallet0001"));
        assert!(html.contains("<td>unknown</td>"));
    }
}
