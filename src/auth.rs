//! Fixed login sequence against the reservation site.
//!
//! Deterministic and linear: navigate to the landing page, open the login
//! dialog, switch to email/password, fill the fields, submit. Each step is
//! followed by a fixed settle delay because the site renders asynchronously.
//! There is no retry here: any failure is fatal and propagates to `main`.

use chromiumoxide::Page;
use thiserror::Error;
use tokio::time::sleep;
use tracing::info;

use crate::config::{BookingRequest, Credentials};
use crate::utils::constants::{
    ELEMENT_TIMEOUT, EMAIL_INPUT_SELECTOR, EMAIL_METHOD_SELECTOR, LOGIN_BUTTON_SELECTOR,
    LOGIN_STEP_DELAY, LOGIN_SUBMIT_SELECTOR, PASSWORD_INPUT_SELECTOR,
};
use crate::utils::{click_selector, type_into};

#[derive(Error, Debug)]
#[error("login step `{step}` failed: {source}")]
pub struct AuthError {
    step: &'static str,
    #[source]
    source: anyhow::Error,
}

fn at(step: &'static str) -> impl FnOnce(anyhow::Error) -> AuthError {
    move |source| AuthError { step, source }
}

pub async fn login(
    page: &Page,
    request: &BookingRequest,
    credentials: &Credentials,
) -> Result<(), AuthError> {
    let home = request
        .home_url()
        .map_err(|e| at("home-url")(e.into()))?;

    info!(url = %home, "navigating to landing page");
    page.goto(home.as_str())
        .await
        .map_err(|e| at("navigate-home")(anyhow::anyhow!("{e}")))?;
    page.wait_for_navigation()
        .await
        .map_err(|e| at("navigate-home")(anyhow::anyhow!("{e}")))?;
    sleep(LOGIN_STEP_DELAY).await;

    info!("opening login dialog");
    click_selector(page, LOGIN_BUTTON_SELECTOR, ELEMENT_TIMEOUT)
        .await
        .map_err(at("open-login"))?;
    sleep(LOGIN_STEP_DELAY).await;

    click_selector(page, EMAIL_METHOD_SELECTOR, ELEMENT_TIMEOUT)
        .await
        .map_err(at("choose-email-login"))?;
    sleep(LOGIN_STEP_DELAY).await;

    info!(email = %credentials.email, "filling credentials");
    type_into(page, EMAIL_INPUT_SELECTOR, &credentials.email, ELEMENT_TIMEOUT)
        .await
        .map_err(at("enter-email"))?;
    type_into(
        page,
        PASSWORD_INPUT_SELECTOR,
        &credentials.password,
        ELEMENT_TIMEOUT,
    )
    .await
    .map_err(at("enter-password"))?;

    click_selector(page, LOGIN_SUBMIT_SELECTOR, ELEMENT_TIMEOUT)
        .await
        .map_err(at("submit-login"))?;
    sleep(LOGIN_STEP_DELAY).await;

    info!("login sequence complete");
    Ok(())
}
