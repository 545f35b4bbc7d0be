mod utils;
#[allow(unused)]
use utils::*;

#[cfg(feature = "integration")]
mod tests {
    use super::*;

    use reqwest::{Client, StatusCode};
    use std::time::Duration;

    #[tokio::test]
    async fn single_attacker_gets_rate_limited() {
        init().await;

        let client = Client::new();
        let res = client
            .post(format!("{}/configure", base_url()))
            .json(&serde_json::json!({
                "NUM_THREADS": 1,
                "RATE_LIMIT": 5,
                "ATTACK_MODE": "single",
                "TARGET_ENDPOINT": "/limited",
                "IS_BLACKLISTING": false
            }))
            .send()
            .await
            .expect("configure failed");
        assert!(res.status().is_success());

        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["mode"], "single");
        assert_eq!(body["thread_count"], 1);
        assert!(body["target_url"].as_str().unwrap().ends_with("/limited"));

        // One worker at ~0.1s spacing burns the 5/minute budget within a
        // second; the 6th request comes back 429.
        tokio::time::sleep(Duration::from_secs(3)).await;

        let metrics: serde_json::Value = client
            .get(format!("{}/metrics", base_url()))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(metrics["rate_limited_rate_pct"].as_f64().unwrap() > 0.0);
        assert_ne!(metrics["status"], "stopped");
        assert!(metrics["requests_per_second"].as_f64().unwrap() > 0.0);

        let logs: serde_json::Value = client
            .get(format!("{}/logs", base_url()))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(!logs.as_array().unwrap().is_empty());

        // Stopping twice is observably the same as stopping once.
        for _ in 0..2 {
            let res = client
                .post(format!("{}/stop", base_url()))
                .send()
                .await
                .unwrap();
            assert!(res.status().is_success());
        }

        let metrics: serde_json::Value = client
            .get(format!("{}/metrics", base_url()))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(metrics["status"], "stopped");
        assert_eq!(metrics["requests_per_second"].as_f64().unwrap(), 0.0);
    }

    #[tokio::test]
    async fn malformed_config_is_rejected_and_stays_idle() {
        init().await;

        let client = Client::new();
        let res = client
            .post(format!("{}/configure", base_url()))
            .json(&serde_json::json!({ "NUM_THREADS": 0 }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn blacklist_gate_runs_before_rate_limiting() {
        init().await;

        let client = Client::new();
        let ip = "203.0.113.9";

        // More requests than the rate limit allows, all rejected at the
        // gate; none of them may count against the quota. Re-adding before
        // each request keeps the periodic eviction ticker out of the way.
        for _ in 0..7 {
            let res = client
                .post(format!("{}/blacklist/{ip}", base_url()))
                .send()
                .await
                .unwrap();
            assert!(res.status().is_success());

            let res = client
                .get(format!("{}/limited", base_url()))
                .header("X-Forwarded-For", ip)
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::FORBIDDEN);
        }

        client
            .delete(format!("{}/blacklist/{ip}", base_url()))
            .send()
            .await
            .unwrap();

        // Quota untouched, so the first real request goes through.
        let res = client
            .get(format!("{}/limited", base_url()))
            .header("X-Forwarded-For", ip)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn blacklist_is_forgotten_after_periodic_clear() {
        init().await;

        let client = Client::new();
        let ip = "203.0.113.77";

        // A clear may fire between the add and the probe; retry once more
        // in that case before concluding the gate is broken.
        let mut blocked = false;
        for _ in 0..3 {
            client
                .post(format!("{}/blacklist/{ip}", base_url()))
                .send()
                .await
                .unwrap();
            let res = client
                .get(format!("{}/open", base_url()))
                .header("X-Forwarded-For", ip)
                .send()
                .await
                .unwrap();
            if res.status() == StatusCode::FORBIDDEN {
                blocked = true;
                break;
            }
        }
        assert!(blocked);

        // The eviction ticker fires every 10 seconds.
        tokio::time::sleep(Duration::from_secs(11)).await;

        let res = client
            .get(format!("{}/open", base_url()))
            .header("X-Forwarded-For", ip)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn open_endpoint_never_limits() {
        init().await;

        let client = Client::new();
        for _ in 0..10 {
            let res = client
                .get(format!("{}/open", base_url()))
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
    }
}
