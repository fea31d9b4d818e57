use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Utc};
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use mongodb::options::FindOptions;
use rocket::futures::TryStreamExt;
use serde::Serialize;

use crate::error::Result;
use crate::model::{
    mongodb::{question_id_filter, Coll},
    question::{Question, QuestionType},
    response::{Answer, Response},
};
use crate::Config;

/// How many calendar days the trend series covers.
pub const TREND_DAYS: i64 = 7;

/// How many responses the "recent" panel shows.
const RECENT_RESPONSES: i64 = 5;

/// Distribution of one choice question's answers across its option set.
#[derive(Debug, Serialize)]
pub struct PieChart {
    pub labels: Vec<String>,
    pub data: Vec<u64>,
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

impl PieChart {
    /// The chart for a question that is missing or not a choice question.
    fn empty() -> Self {
        Self {
            labels: Vec::new(),
            data: Vec::new(),
            question: None,
            total: None,
        }
    }
}

/// The chart.js dataset envelope the dashboard frontend consumes.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarDataset {
    pub label: String,
    pub data: Vec<f64>,
    pub background_color: String,
    pub border_color: String,
    pub border_width: u32,
}

/// Average ratings for the scale questions.
#[derive(Debug, Serialize)]
pub struct RadarChart {
    pub labels: Vec<String>,
    pub datasets: Vec<RadarDataset>,
}

/// Responses received on one calendar day.
#[derive(Debug, Serialize)]
pub struct TrendPoint {
    pub date: String,
    pub day: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct RecentResponse {
    pub id: String,
    pub email: String,
    pub date: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct PieCharts {
    pub purchase_frequency: PieChart,
    pub recommendation_likelihood: PieChart,
    pub product_category: PieChart,
}

#[derive(Debug, Serialize)]
pub struct PeriodCounts {
    pub today: u64,
    pub this_week: u64,
    pub this_month: u64,
}

/// The full dashboard payload, recomputed from storage on every call.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub total_responses: u64,
    pub pie_charts: PieCharts,
    pub radar_chart: RadarChart,
    pub recent_responses: Vec<RecentResponse>,
    pub response_trends: Vec<TrendPoint>,
    pub statistics: PeriodCounts,
}

/// Shorten a question prompt to a chart label via a keyword table, falling
/// back to the prompt's first three words.
pub fn short_label(question_text: &str) -> String {
    const LABELS: [(&str, &str); 5] = [
        ("ease of use", "Ease of Use"),
        ("features", "Product Features"),
        ("delivery speed", "Delivery Speed"),
        ("website", "Website Experience"),
        ("pricing", "Price Competitiveness"),
    ];

    let lower = question_text.to_lowercase();
    for (keyword, label) in LABELS {
        if lower.contains(keyword) {
            return label.to_string();
        }
    }
    question_text
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Arithmetic mean rounded to 2 decimal places; 0 when there are no ratings.
pub fn mean_rating(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: i64 = values.iter().sum();
    let mean = sum as f64 / values.len() as f64;
    (mean * 100.0).round() / 100.0
}

/// Compute the option distribution for one choice question.
///
/// The label set is driven by the catalog's option list, so options nobody
/// picked yet still appear with a zero count.
pub async fn pie_chart(
    questions: &Coll<Question>,
    answers: &Coll<Answer>,
    question_id: u32,
) -> Result<PieChart> {
    let question = questions
        .find_one(question_id_filter(question_id), None)
        .await?;
    let Some(question) = question else {
        return Ok(PieChart::empty());
    };
    if question.qtype != QuestionType::ChoiceSingle {
        return Ok(PieChart::empty());
    }
    let options = question.options.unwrap_or_default();

    let mut labels = Vec::with_capacity(options.len());
    let mut data = Vec::with_capacity(options.len());
    for option in options {
        let count = answers
            .count_documents(
                doc! { "question_id": question_id, "answer_text": &option },
                None,
            )
            .await?;
        labels.push(option);
        data.push(count);
    }

    Ok(PieChart {
        total: Some(data.iter().sum()),
        labels,
        data,
        question: Some(question.question_text),
    })
}

/// Compute average ratings for the given scale questions, in order.
/// Questions that are missing or not scale-typed are omitted entirely.
pub async fn radar_chart(
    questions: &Coll<Question>,
    answers: &Coll<Answer>,
    question_ids: &[u32],
) -> Result<RadarChart> {
    let mut labels = Vec::new();
    let mut averages = Vec::new();

    for &question_id in question_ids {
        let question = questions
            .find_one(question_id_filter(question_id), None)
            .await?;
        let Some(question) = question else { continue };
        if question.qtype != QuestionType::ScaleFive {
            continue;
        }

        let ratings: Vec<Answer> = answers
            .find(doc! { "question_id": question_id }, None)
            .await?
            .try_collect()
            .await?;
        // Answers that predate a type edit may not parse; they are skipped
        // rather than counted as zero.
        let values: Vec<i64> = ratings
            .iter()
            .filter_map(|answer| answer.answer_text.parse().ok())
            .collect();

        labels.push(short_label(&question.question_text));
        averages.push(mean_rating(&values));
    }

    Ok(RadarChart {
        labels,
        datasets: vec![RadarDataset {
            label: "Average Rating".to_string(),
            data: averages,
            background_color: "rgba(54, 162, 235, 0.2)".to_string(),
            border_color: "rgba(54, 162, 235, 1)".to_string(),
            border_width: 2,
        }],
    })
}

/// UTC instant of local midnight on the given date.
fn local_midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).unwrap(); // Midnight always exists
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// A filter matching responses created in `[from, to)` local days.
fn created_between(from: NaiveDate, to: NaiveDate) -> Document {
    doc! {
        "created_at": {
            "$gte": BsonDateTime::from_chrono(local_midnight_utc(from)),
            "$lt": BsonDateTime::from_chrono(local_midnight_utc(to)),
        }
    }
}

/// Daily response counts for the last `days` local calendar days,
/// oldest first and inclusive of today.
pub async fn trends(responses: &Coll<Response>, days: i64) -> Result<Vec<TrendPoint>> {
    let today = Local::now().date_naive();
    let mut points = Vec::with_capacity(days as usize);
    for offset in (0..days).rev() {
        let date = today - Duration::days(offset);
        let count = responses
            .count_documents(created_between(date, date + Duration::days(1)), None)
            .await?;
        points.push(TrendPoint {
            date: date.format("%Y-%m-%d").to_string(),
            day: date.format("%a").to_string(),
            count,
        });
    }
    Ok(points)
}

/// Today / this-week / this-month response counts. Weeks start on Monday;
/// months are calendar months.
async fn period_counts(responses: &Coll<Response>) -> Result<PeriodCounts> {
    let today = Local::now().date_naive();

    let week_start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    let month_start = today.with_day(1).unwrap(); // Day 1 always exists
    let next_month_start = if today.month() == 12 {
        NaiveDate::from_ymd_opt(today.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(today.year(), today.month() + 1, 1)
    }
    .unwrap(); // The first of a month always exists

    Ok(PeriodCounts {
        today: responses
            .count_documents(created_between(today, today + Duration::days(1)), None)
            .await?,
        this_week: responses
            .count_documents(
                created_between(week_start, week_start + Duration::days(7)),
                None,
            )
            .await?,
        this_month: responses
            .count_documents(created_between(month_start, next_month_start), None)
            .await?,
    })
}

/// The newest responses, most recent first.
async fn recent_responses(responses: &Coll<Response>) -> Result<Vec<RecentResponse>> {
    let options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .limit(RECENT_RESPONSES)
        .build();
    let newest: Vec<Response> = responses.find(None, options).await?.try_collect().await?;
    Ok(newest
        .into_iter()
        .map(|response| RecentResponse {
            id: response.id.to_string(),
            email: response.email,
            date: response
                .created_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            token: response.token,
        })
        .collect())
}

/// Assemble the full dashboard. Which questions feed which chart comes from
/// deployment configuration, not from the aggregation algorithms.
pub async fn snapshot(
    config: &Config,
    questions: &Coll<Question>,
    responses: &Coll<Response>,
    answers: &Coll<Answer>,
) -> Result<Dashboard> {
    let pies = config.pie_chart_questions();

    Ok(Dashboard {
        total_responses: responses.count_documents(None, None).await?,
        pie_charts: PieCharts {
            purchase_frequency: pie_chart(questions, answers, pies.purchase_frequency).await?,
            recommendation_likelihood: pie_chart(questions, answers, pies.recommendation_likelihood)
                .await?,
            product_category: pie_chart(questions, answers, pies.product_category).await?,
        },
        radar_chart: radar_chart(questions, answers, config.radar_chart_questions()).await?,
        recent_responses: recent_responses(responses).await?,
        response_trends: trends(responses, TREND_DAYS).await?,
        statistics: period_counts(responses).await?,
    })
}
