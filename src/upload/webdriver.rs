use anyhow::{Result, anyhow};
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{Value, json};
use std::time::Duration;

/// W3C web element identifier key
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// What the upload loop needs from a browser.
pub trait FormBrowser {
    fn open(&mut self, url: &str) -> Result<()>;
    fn type_into(&mut self, xpath: &str, text: &str) -> Result<()>;
    fn click(&mut self, xpath: &str) -> Result<()>;
}

/// A Firefox session on a WebDriver server such as geckodriver.
pub struct WebDriver {
    http: Client,
    base: String,
    session_id: String,
    closed: bool,
}

fn send(req: RequestBuilder) -> Result<Value> {
    let resp = req.send()?;
    let status = resp.status();
    let body: Value = resp
        .json()
        .map_err(|e| anyhow!("WebDriver returned {status} with a non-JSON body: {e}"))?;
    let value = body.get("value").cloned().unwrap_or(Value::Null);

    if let Some(err) = value.get("error").and_then(Value::as_str) {
        let msg = value.get("message").and_then(Value::as_str).unwrap_or("");
        return Err(anyhow!("WebDriver {status}: {err}: {msg}"));
    }
    if !status.is_success() {
        return Err(anyhow!("WebDriver returned {status}"));
    }
    Ok(value)
}

pub fn firefox_capabilities(headless: bool) -> Value {
    let args: Vec<&str> = if headless { vec!["-headless"] } else { vec![] };
    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "firefox",
                "moz:firefoxOptions": { "args": args }
            }
        }
    })
}

impl WebDriver {
    pub fn start(base: &str, headless: bool) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(120)).build()?;
        let base = base.trim_end_matches('/').to_string();

        let value = send(
            http.post(format!("{base}/session"))
                .json(&firefox_capabilities(headless)),
        )
        .map_err(|e| anyhow!("cannot start browser session at {base} (is geckodriver running?): {e}"))?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("WebDriver new session response has no sessionId"))?
            .to_string();
        log::debug!("webdriver session {session_id} started");

        Ok(Self {
            http,
            base,
            session_id,
            closed: false,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base, self.session_id, path)
    }

    pub fn navigate(&self, url: &str) -> Result<()> {
        send(self.http.post(self.url("/url")).json(&json!({ "url": url })))?;
        Ok(())
    }

    pub fn find_xpath(&self, xpath: &str) -> Result<String> {
        let value = send(
            self.http
                .post(self.url("/element"))
                .json(&json!({ "using": "xpath", "value": xpath })),
        )
        .map_err(|e| anyhow!("element {xpath} not found: {e}"))?;

        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("malformed element reference for {xpath}"))
    }

    pub fn send_keys(&self, element: &str, text: &str) -> Result<()> {
        send(
            self.http
                .post(self.url(&format!("/element/{element}/value")))
                .json(&json!({ "text": text })),
        )?;
        Ok(())
    }

    pub fn click_element(&self, element: &str) -> Result<()> {
        send(
            self.http
                .post(self.url(&format!("/element/{element}/click")))
                .json(&json!({})),
        )?;
        Ok(())
    }

    /// End the session and close the browser.
    pub fn quit(mut self) -> Result<()> {
        self.closed = true;
        send(self.http.delete(self.url("")))?;
        Ok(())
    }
}

impl FormBrowser for WebDriver {
    fn open(&mut self, url: &str) -> Result<()> {
        self.navigate(url)
    }

    fn type_into(&mut self, xpath: &str, text: &str) -> Result<()> {
        let el = self.find_xpath(xpath)?;
        self.send_keys(&el, text)
    }

    fn click(&mut self, xpath: &str) -> Result<()> {
        let el = self.find_xpath(xpath)?;
        self.click_element(&el)
    }
}

impl Drop for WebDriver {
    fn drop(&mut self) {
        if !self.closed {
            let _ = send(self.http.delete(self.url("")));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_adds_firefox_flag() {
        let caps = firefox_capabilities(true);
        let args = &caps["capabilities"]["alwaysMatch"]["moz:firefoxOptions"]["args"];
        assert_eq!(args, &json!(["-headless"]));
        assert_eq!(caps["capabilities"]["alwaysMatch"]["browserName"], "firefox");
    }

    #[test]
    fn visible_browser_has_no_args() {
        let caps = firefox_capabilities(false);
        let args = &caps["capabilities"]["alwaysMatch"]["moz:firefoxOptions"]["args"];
        assert_eq!(args, &json!([]));
    }
}
