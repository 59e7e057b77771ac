//! One handler per agent type. Only the content and social handlers talk to
//! the model; the others simulate their integrations from the agent config.

use agentrun_llm::{ChatMessage, CompletionRequest, HANDLER_MAX_TOKENS, LlmClient};
use agentrun_models::core::{Agent, AgentType};
use chrono::Utc;
use serde_json::{Value, json};

use crate::error::ExecutorError;

pub async fn run_handler(
    agent: &Agent,
    llm: &dyn LlmClient,
    model: &str,
    context: Option<&str>,
) -> Result<Value, ExecutorError> {
    match agent.agent_type {
        AgentType::ContentGenerator => generate_content(agent, llm, model, context).await,
        AgentType::SocialMediaManager => compose_social_post(agent, llm, model, context).await,
        AgentType::InventoryMonitor => Ok(monitor_inventory(&agent.config)),
        AgentType::PriceOptimizer => Ok(optimize_prices(&agent.config)),
        AgentType::EmailCampaign => Ok(plan_email_campaign(&agent.config)),
        AgentType::SeoOptimizer => Ok(score_keywords(&agent.config)),
    }
}

fn config_str<'a>(config: &'a Value, key: &str, default: &'a str) -> &'a str {
    config.get(key).and_then(Value::as_str).unwrap_or(default)
}

fn with_context(prompt: String, context: Option<&str>) -> String {
    match context {
        Some(notes) if !notes.trim().is_empty() => {
            format!("{prompt}\n\nUse this planning from earlier reasoning:\n{notes}")
        }
        _ => prompt,
    }
}

async fn generate_content(
    agent: &Agent,
    llm: &dyn LlmClient,
    model: &str,
    context: Option<&str>,
) -> Result<Value, ExecutorError> {
    let topic = config_str(&agent.config, "topic", "our latest products");
    let tone = config_str(&agent.config, "tone", "friendly");
    let audience = config_str(&agent.config, "audience", "online shoppers");

    let prompt = with_context(
        format!("Write a short marketing article about {topic} for {audience}. Keep the tone {tone}."),
        context,
    );
    let content = llm
        .complete(CompletionRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system("You are a copywriter for an e-commerce storefront."),
                ChatMessage::user(prompt),
            ],
            max_tokens: HANDLER_MAX_TOKENS,
        })
        .await?;

    Ok(json!({
        "topic": topic,
        "tone": tone,
        "content": content,
    }))
}

async fn compose_social_post(
    agent: &Agent,
    llm: &dyn LlmClient,
    model: &str,
    context: Option<&str>,
) -> Result<Value, ExecutorError> {
    let platform = config_str(&agent.config, "platform", "instagram");
    let product = config_str(&agent.config, "product", "our bestseller");

    let prompt = with_context(
        format!("Write one {platform} post promoting {product}. Include two hashtags."),
        context,
    );
    let post = llm
        .complete(CompletionRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system("You manage social media for an e-commerce storefront."),
                ChatMessage::user(prompt),
            ],
            max_tokens: HANDLER_MAX_TOKENS,
        })
        .await?;

    Ok(json!({
        "platform": platform,
        "product": product,
        "post": post,
    }))
}

const STOCK_LEVELS: [(&str, &str, i64); 5] = [
    ("SKU-1001", "Linen summer shirt", 3),
    ("SKU-1002", "Leather sandals", 18),
    ("SKU-1003", "Canvas tote bag", 7),
    ("SKU-1004", "Straw hat", 0),
    ("SKU-1005", "Polarized sunglasses", 42),
];

fn monitor_inventory(config: &Value) -> Value {
    let threshold = config
        .get("low_stock_threshold")
        .and_then(Value::as_i64)
        .unwrap_or(10);

    let low_stock: Vec<Value> = STOCK_LEVELS
        .iter()
        .filter(|(_, _, quantity)| *quantity < threshold)
        .map(|(sku, name, quantity)| {
            json!({
                "sku": sku,
                "name": name,
                "quantity": quantity,
                "out_of_stock": *quantity == 0,
            })
        })
        .collect();

    json!({
        "threshold": threshold,
        "checked_products": STOCK_LEVELS.len(),
        "low_stock_items": low_stock,
        "checked_at": Utc::now().to_rfc3339(),
    })
}

// (sku, our price, competitor price), in cents
const PRICE_POINTS: [(&str, i64, i64); 4] = [
    ("SKU-1001", 4_900, 4_500),
    ("SKU-1002", 7_900, 8_200),
    ("SKU-1003", 2_400, 1_900),
    ("SKU-1005", 3_500, 3_400),
];

fn optimize_prices(config: &Value) -> Value {
    let max_discount_percent = config
        .get("max_discount_percent")
        .and_then(Value::as_i64)
        .unwrap_or(15)
        .clamp(0, 90);

    let suggestions: Vec<Value> = PRICE_POINTS
        .iter()
        .map(|(sku, price, competitor)| {
            let floor = price * (100 - max_discount_percent) / 100;
            // Undercut the competitor by 2% but never below the discount floor.
            let target = (competitor * 98 / 100).max(floor);
            let suggested = if *competitor < *price { target } else { *price };
            json!({
                "sku": sku,
                "current_price_cents": price,
                "competitor_price_cents": competitor,
                "suggested_price_cents": suggested,
                "change_cents": suggested - price,
            })
        })
        .collect();

    json!({
        "max_discount_percent": max_discount_percent,
        "suggestions": suggestions,
    })
}

fn plan_email_campaign(config: &Value) -> Value {
    let segment = config_str(config, "segment", "all_subscribers");
    let campaign = config_str(config, "campaign_name", "Weekly picks");
    let audience_size: i64 = match segment {
        "vip" => 240,
        "lapsed" => 1_180,
        "new_customers" => 560,
        _ => 4_300,
    };
    let batch_size = config
        .get("batch_size")
        .and_then(Value::as_i64)
        .filter(|size| *size > 0)
        .unwrap_or(500);

    json!({
        "campaign": campaign,
        "segment": segment,
        "subject": format!("{campaign}: picked for you"),
        "emails_queued": audience_size,
        "send_batches": (audience_size + batch_size - 1) / batch_size,
    })
}

fn score_keywords(config: &Value) -> Value {
    let keywords: Vec<String> = config
        .get("keywords")
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .filter(|values: &Vec<String>| !values.is_empty())
        .unwrap_or_else(|| {
            vec![
                "summer sale".to_string(),
                "linen shirts".to_string(),
                "free shipping sandals".to_string(),
            ]
        });

    let scored: Vec<Value> = keywords
        .iter()
        .map(|keyword| {
            let words = keyword.split_whitespace().count() as i64;
            // Long-tail phrases rank more easily than single head terms.
            let score = (40 + words * 15).min(95);
            let suggestion = if words < 3 {
                "Target a longer-tail variant in product titles"
            } else {
                "Use as an H1 on a dedicated landing page"
            };
            json!({ "keyword": keyword, "score": score, "suggestion": suggestion })
        })
        .collect();

    json!({ "keywords": scored })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inventory_uses_configured_threshold() {
        let result = monitor_inventory(&json!({ "low_stock_threshold": 5 }));
        let skus: Vec<&str> = result["low_stock_items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["sku"].as_str().unwrap())
            .collect();
        assert_eq!(skus, vec!["SKU-1001", "SKU-1004"]);
    }

    #[test]
    fn prices_never_drop_below_discount_floor() {
        let result = optimize_prices(&json!({ "max_discount_percent": 10 }));
        for suggestion in result["suggestions"].as_array().unwrap() {
            let current = suggestion["current_price_cents"].as_i64().unwrap();
            let suggested = suggestion["suggested_price_cents"].as_i64().unwrap();
            assert!(suggested <= current);
            assert!(suggested >= current * 90 / 100);
        }
        // Competitor is more expensive, so the price holds.
        assert_eq!(result["suggestions"][1]["change_cents"], 0);
    }

    #[test]
    fn email_batches_round_up() {
        let result = plan_email_campaign(&json!({ "segment": "vip", "batch_size": 100 }));
        assert_eq!(result["emails_queued"], 240);
        assert_eq!(result["send_batches"], 3);
    }

    #[test]
    fn seo_falls_back_to_default_keywords() {
        let result = score_keywords(&json!({ "keywords": [] }));
        assert_eq!(result["keywords"].as_array().unwrap().len(), 3);
    }
}
