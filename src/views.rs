// src/views.rs
use std::fmt::Write as _;

use crate::flash::Flash;
use crate::models::{CreatePollForm, PollResults, PollSummary, PollView};

pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn percent(count: i64, total: i64) -> i64 {
    if total > 0 {
        count * 100 / total
    } else {
        0
    }
}

fn layout(title: &str, flash: Option<&Flash>, body: &str) -> String {
    let flash = flash
        .map(|f| {
            let class = if f.is_error() { "error" } else { "success" };
            format!(
                r#"<div class="flash flash-{class}">{}</div>"#,
                escape(&f.message())
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{} - Second</title></head>
<body>
<header><a href="/">Second</a> | <a href="/create">New poll</a></header>
{flash}
<main>
{body}
</main>
</body>
</html>
"#,
        escape(title)
    )
}

pub fn home(polls: &[PollSummary], flash: Option<&Flash>) -> String {
    let mut body = String::from("<h1>Recent polls</h1>\n");

    if polls.is_empty() {
        body.push_str(r#"<p class="empty">No polls yet. <a href="/create">Create one</a>.</p>"#);
        return layout("Recent polls", flash, &body);
    }

    body.push_str("<ul class=\"polls\">\n");
    for p in polls {
        let _ = writeln!(
            body,
            r#"<li><a href="/poll/{id}">{topic}</a> <span class="votes">{votes} votes</span> <time>{created}</time>{closed}</li>"#,
            id = escape(&p.id),
            topic = escape(&p.topic),
            votes = p.vote_count,
            created = p.created_at.format("%Y-%m-%d %H:%M"),
            closed = if p.is_closed { r#" <span class="closed">closed</span>"# } else { "" },
        );
    }
    body.push_str("</ul>");

    layout("Recent polls", flash, &body)
}

pub fn create_form(form: &CreatePollForm, error: Option<&str>) -> String {
    let error = error
        .map(|e| format!(r#"<div class="flash flash-error">{}</div>"#, escape(e)))
        .unwrap_or_default();

    let body = format!(
        r#"<h1>Create a poll</h1>
{error}
<form method="post" action="/create">
<label>Question <input type="text" name="topic" maxlength="200" required value="{topic}"></label>
<label>Option 1 <input type="text" name="option1" maxlength="100" required value="{o1}"></label>
<label>Option 2 <input type="text" name="option2" maxlength="100" required value="{o2}"></label>
<label>Option 3 <input type="text" name="option3" maxlength="100" required value="{o3}"></label>
<button type="submit">Create poll</button>
</form>"#,
        topic = escape(&form.topic),
        o1 = escape(&form.option1),
        o2 = escape(&form.option2),
        o3 = escape(&form.option3),
    );

    layout("Create a poll", None, &body)
}

fn close_button(poll_id: &str) -> String {
    format!(
        r#"<form method="post" action="/poll/{}/close"><button type="submit">Close poll</button></form>"#,
        escape(poll_id)
    )
}

pub fn poll_page(view: &PollView, is_creator: bool, flash: Option<&Flash>) -> String {
    let poll = &view.poll;
    let id = escape(&poll.id);
    let show_counts = view.has_voted || poll.is_closed;

    let mut body = format!("<h1>{}</h1>\n", escape(&poll.topic));

    if poll.is_closed {
        body.push_str("<p class=\"closed\">This poll is closed.</p>\n");
    }

    if show_counts {
        body.push_str("<ul class=\"counts\">\n");
        for (option, label) in poll.options() {
            let count = view.vote_counts.get(&option).copied().unwrap_or(0);
            let _ = writeln!(
                body,
                "<li>{} <span>{count} votes ({}%)</span></li>",
                escape(label),
                percent(count, view.total_votes)
            );
        }
        let _ = writeln!(body, "</ul>\n<p>{} total votes</p>", view.total_votes);
    } else {
        let _ = writeln!(body, r#"<form method="post" action="/vote/{id}">"#);
        for (option, label) in poll.options() {
            let _ = writeln!(
                body,
                r#"<label class="vote-option"><input type="radio" name="option" value="{option}" required> {}</label>"#,
                escape(label)
            );
        }
        body.push_str("<button type=\"submit\">Vote</button>\n</form>\n");
    }

    let _ = writeln!(body, r#"<p><a href="/poll/{id}/results">See results</a></p>"#);

    if is_creator && !poll.is_closed {
        body.push_str(&close_button(&poll.id));
    }

    layout(&poll.topic, flash, &body)
}

pub fn results_page(results: &PollResults, is_creator: bool, flash: Option<&Flash>) -> String {
    let poll = &results.poll;
    let total = results.total_votes();

    let mut body = format!(
        "<h1>Results: {}</h1>\n<ol class=\"ranked\">\n",
        escape(&poll.topic)
    );

    for &(option, count) in &results.ranked_results {
        let label = poll.option_label(option).unwrap_or_default();
        let class = if results.winner_option == Some(option) {
            " class=\"winner\""
        } else {
            ""
        };
        let _ = writeln!(
            body,
            "<li{class}>{} <span>{count} votes ({}%)</span></li>",
            escape(label),
            percent(count, total)
        );
    }

    let _ = write!(
        body,
        "</ol>\n<p class=\"winner-text\">Winner: {}</p>\n<p>{total} total votes</p>\n",
        escape(&results.winner_text)
    );
    let _ = writeln!(
        body,
        r#"<p><a href="/poll/{}">Back to poll</a></p>"#,
        escape(&poll.id)
    );

    if is_creator && !poll.is_closed {
        body.push_str(&close_button(&poll.id));
    }

    layout(&format!("Results: {}", poll.topic), flash, &body)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{Poll, VoteCounts};

    fn poll() -> Poll {
        Poll {
            id: "abc123".to_string(),
            topic: "<script>alert(1)</script>".to_string(),
            option1: "Tea & biscuits".to_string(),
            option2: "Coffee".to_string(),
            option3: "Water".to_string(),
            creator_ip: "10.0.0.1".to_string(),
            created_at: Utc::now(),
            is_closed: false,
        }
    }

    #[test]
    fn user_text_is_escaped() {
        let view = PollView {
            poll: poll(),
            has_voted: false,
            vote_counts: VoteCounts::new(),
            total_votes: 0,
        };
        let html = poll_page(&view, false, None);

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Tea &amp; biscuits"));
        assert!(html.contains(r#"action="/vote/abc123""#));
        assert!(!html.contains("Close poll"));
    }

    #[test]
    fn voted_viewer_sees_percentages() {
        let view = PollView {
            poll: poll(),
            has_voted: true,
            vote_counts: VoteCounts::from([(1, 1), (3, 3)]),
            total_votes: 4,
        };
        let html = poll_page(&view, true, Some(&Flash::VoteSubmitted));

        assert!(html.contains("1 votes (25%)"));
        assert!(html.contains("0 votes (0%)"));
        assert!(html.contains("3 votes (75%)"));
        assert!(html.contains("Vote submitted!"));
        assert!(html.contains("Close poll"));
        assert!(!html.contains(r#"name="option""#));
    }

    #[test]
    fn results_mark_the_winner() {
        let results = PollResults {
            poll: poll(),
            vote_counts: VoteCounts::from([(1, 5), (2, 3), (3, 0)]),
            ranked_results: vec![(1, 5), (2, 3), (3, 0)],
            winner_option: Some(2),
            winner_text: "'Coffee' (2nd place with 3 votes)".to_string(),
        };
        let html = results_page(&results, false, None);

        assert!(html.contains(r#"<li class="winner">Coffee"#));
        assert!(html.contains("&#39;Coffee&#39; (2nd place with 3 votes)"));
        assert!(html.contains("8 total votes"));
    }
}
