//! Integration tests for the recruitment pipeline
//!
//! A roster site and a killboard are each served by their own wiremock
//! server so the two `/character/{id}` namespaces stay apart.

use roster_scout::config::FetcherConfig;
use roster_scout::fetch::{build_http_client, RecordingSleeper, RetryPolicy};
use roster_scout::output::{make_csv_file_name, read_csv_file, save_members_csv, CSV_HEADERS};
use roster_scout::recruit::{RecruitPipeline, RecruitRequest, Thresholds};
use roster_scout::roster::SiteUrls;
use roster_scout::state::RecordingProgress;
use roster_scout::{MovementType, PageFetcher, PaginatedExtractor, ScoutError};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Sites {
    roster: MockServer,
    killboard: MockServer,
}

impl Sites {
    async fn start() -> Self {
        Self {
            roster: MockServer::start().await,
            killboard: MockServer::start().await,
        }
    }

    fn pipeline(&self) -> RecruitPipeline {
        let client = build_http_client(&FetcherConfig::default()).expect("client");
        let fetcher = PageFetcher::with_client(client, RetryPolicy::new(0, Duration::from_millis(1)))
            .with_sleeper(Arc::new(RecordingSleeper::new()));
        let urls = SiteUrls::new(&self.roster.uri(), &self.killboard.uri());
        RecruitPipeline::new(PaginatedExtractor::new(fetcher, urls), 2)
    }

    async fn heading(&self, route: String, name: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!("<html><body><h4> {} </h4></body></html>", name)),
            )
            .mount(&self.roster)
            .await;
    }

    async fn roster_pages(&self, corp_id: &str, pages: &[&[(&str, &str)]]) {
        for (index, rows) in pages.iter().enumerate() {
            let mut html = String::from("<html><body>");
            for (id, name) in rows.iter() {
                html.push_str(&format!(
                    r#"<div><a href="/character/{}">{}</a> <span class="departed">2024/06/09 10:00</span></div>"#,
                    id, name
                ));
            }
            html.push_str("</body></html>");
            Mock::given(method("GET"))
                .and(path(format!("/pug/list/{}/current/{}", corp_id, index + 1)))
                .respond_with(ResponseTemplate::new(200).set_body_string(html))
                .mount(&self.roster)
                .await;
        }
        Mock::given(method("GET"))
            .and(path(format!("/pug/list/{}/current/{}", corp_id, pages.len() + 1)))
            .respond_with(ResponseTemplate::new(404))
            .mount(&self.roster)
            .await;
    }

    async fn kill_stats(&self, character_id: &str, kills: &str, efficiency: &str) {
        let html = format!(
            r#"<html><body><table id="statsbox"><tbody>
                <tr><td>All time</td></tr>
                <tr><td>Ships</td></tr>
                <tr><td>{}</td><td>x</td><td>x</td><td>x</td><td>{}</td></tr>
            </tbody></table></body></html>"#,
            kills, efficiency
        );
        Mock::given(method("GET"))
            .and(path(format!("/character/{}", character_id)))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(&self.killboard)
            .await;
    }
}

fn current_request(corp_ids: &[&str]) -> RecruitRequest {
    RecruitRequest {
        corp_ids: corp_ids.iter().map(|id| id.to_string()).collect(),
        movement: MovementType::Current,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_pipeline_enriches_members_in_order() {
    let sites = Sites::start().await;
    sites.heading("/corporation/100".to_string(), "Alpha Corp").await;
    sites.heading("/corporation/200".to_string(), "Beta Corp").await;
    sites
        .roster_pages("100", &[&[("1", "Ana"), ("2", "Bo")], &[("3", "Cy")]])
        .await;
    sites.roster_pages("200", &[&[("4", "Di")]]).await;
    sites.kill_stats("1", "1,200", "91.5").await;
    sites.kill_stats("2", "3", "12").await;
    sites.kill_stats("4", "40", "75").await;
    // character 3 has no killboard page

    let progress = RecordingProgress::new();
    let mut request = current_request(&["100", "200"]);
    request.file_name_prefix = Some("My Alliance".to_string());

    let outcome = sites
        .pipeline()
        .run(&request, &progress, &CancellationToken::new())
        .await
        .unwrap();

    let names: Vec<_> = outcome.rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Ana", "Bo", "Cy", "Di"]);
    assert_eq!(outcome.corporations_done, 2);
    assert_eq!(outcome.corporations_total, 2);
    assert!(!outcome.cancelled);
    assert_eq!(outcome.prefix, "My Alliance");

    let ana = &outcome.rows[0];
    assert_eq!(ana.corp_name, "Alpha Corp");
    assert_eq!(ana.corp_id, "100");
    assert_eq!(ana.destroyed_ships_text(), "1200");
    assert_eq!(ana.efficiency_text(), "91.5%");
    assert_eq!(ana.eve_who_link, format!("{}/character/1", sites.roster.uri()));
    assert_eq!(ana.zkillboard_link, format!("{}/character/1", sites.killboard.uri()));

    let cy = &outcome.rows[2];
    assert_eq!(cy.destroyed_ships_text(), "");
    assert_eq!(cy.efficiency_text(), "No Data");
    assert_eq!(outcome.rows[3].corp_name, "Beta Corp");

    let messages = progress.messages();
    assert!(messages
        .iter()
        .any(|m| m.starts_with("[My Alliance] extracting 2/2 corps [Beta Corp]:")));
    assert_eq!(
        messages.last().map(String::as_str),
        Some("Found 4 worthy characters")
    );
}

#[tokio::test]
async fn test_thresholds_drop_weak_members() {
    let sites = Sites::start().await;
    sites.heading("/corporation/100".to_string(), "Alpha Corp").await;
    sites
        .roster_pages("100", &[&[("1", "Ana"), ("2", "Bo"), ("3", "Cy")]])
        .await;
    sites.kill_stats("1", "50", "80").await;
    sites.kill_stats("2", "50", "40").await;
    sites.kill_stats("3", "5", "99").await;

    let mut request = current_request(&["100"]);
    request.thresholds = Thresholds {
        min_destroyed_ships: Some(50),
        min_efficiency: Some(40.0),
    };

    let outcome = sites
        .pipeline()
        .run(&request, &RecordingProgress::new(), &CancellationToken::new())
        .await
        .unwrap();

    let ids: Vec<_> = outcome.rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["1"]);
}

#[tokio::test]
async fn test_alliance_supplies_corporations_and_prefix() {
    let sites = Sites::start().await;
    Mock::given(method("GET"))
        .and(path("/alliance/77"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><h4>Test Alliance</h4>
            <a href="/corporation/100">Alpha</a>
            <a href="/corporation/100">Alpha again</a>
            </body></html>"#,
        ))
        // one request serves both the corporation list and the name
        .expect(1)
        .mount(&sites.roster)
        .await;
    sites.heading("/corporation/100".to_string(), "Alpha Corp").await;
    sites.roster_pages("100", &[&[("1", "Ana")]]).await;
    sites.kill_stats("1", "1", "1").await;

    let request = RecruitRequest {
        alliance_id: Some("77".to_string()),
        movement: MovementType::Current,
        ..Default::default()
    };
    let outcome = sites
        .pipeline()
        .run(&request, &RecordingProgress::new(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.corporations_total, 1);
    assert_eq!(outcome.prefix, "Test Alliance");
    assert_eq!(
        make_csv_file_name(&outcome.prefix, outcome.movement),
        "Test_Alliance_current_members.csv"
    );
    sites.roster.verify().await;
}

#[tokio::test]
async fn test_missing_target_is_an_error() {
    let sites = Sites::start().await;
    let result = sites
        .pipeline()
        .run(
            &current_request(&[]),
            &RecordingProgress::new(),
            &CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(ScoutError::MissingTarget)));
}

#[tokio::test]
async fn test_unresolved_corporation_name_is_fatal() {
    let sites = Sites::start().await;
    Mock::given(method("GET"))
        .and(path("/corporation/100"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&sites.roster)
        .await;

    let result = sites
        .pipeline()
        .run(
            &current_request(&["100"]),
            &RecordingProgress::new(),
            &CancellationToken::new(),
        )
        .await;

    match result {
        Err(ScoutError::NameUnresolved { url }) => {
            assert_eq!(url, format!("{}/corporation/100", sites.roster.uri()));
        }
        other => panic!("expected NameUnresolved, got {:?}", other),
    }
}

#[tokio::test]
async fn test_cancelled_pipeline_processes_no_corporations() {
    let sites = Sites::start().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = sites
        .pipeline()
        .run(&current_request(&["100", "200"]), &RecordingProgress::new(), &cancel)
        .await
        .unwrap();

    assert!(outcome.cancelled);
    assert!(outcome.rows.is_empty());
    assert_eq!(outcome.corporations_done, 0);
}

#[tokio::test]
async fn test_results_round_trip_through_csv_file() {
    let sites = Sites::start().await;
    sites.heading("/corporation/100".to_string(), "Alpha \"Best\" Corp").await;
    sites.roster_pages("100", &[&[("1", "Ana"), ("2", "Bo")]]).await;
    sites.kill_stats("1", "10", "50").await;
    sites.kill_stats("2", "20", "60").await;

    let outcome = sites
        .pipeline()
        .run(
            &current_request(&["100"]),
            &RecordingProgress::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    let file_name = make_csv_file_name(&outcome.prefix, outcome.movement);
    assert_eq!(file_name, "extracted_current_members.csv");

    let path = save_members_csv(dir.path(), &file_name, &outcome.rows)
        .unwrap()
        .expect("file written");
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with(&format!("{}\n", CSV_HEADERS.join(","))));
    assert!(text.contains(r#""Alpha ""Best"" Corp""#));

    let table = read_csv_file(&path).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.data[1]["Name"], "Bo");
    assert_eq!(table.data[1]["CorpName"], "Alpha \"Best\" Corp");
    assert_eq!(table.data[1]["Efficiency"], "60%");
    assert_eq!(table.data[1]["DateLeft"], "2024/06/09 10:00");

    assert_eq!(save_members_csv(dir.path(), "empty.csv", &[]).unwrap(), None);
    assert!(!dir.path().join("empty.csv").exists());
}
