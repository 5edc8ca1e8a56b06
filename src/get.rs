//! `tix get`: print one stored topic.

use anyhow::Result;
use topic_index_core::{IndexError, Topic, TopicIndex};

/// Look up a topic, mapping a miss to [`IndexError::NotFound`].
pub fn get_topic(index: &TopicIndex, id: &str) -> Result<Topic, IndexError> {
    index
        .get(id)
        .ok_or_else(|| IndexError::NotFound(id.to_string()))
}

/// CLI entry point. Prints the normalized topic as JSON, or a short
/// human-readable header followed by the JSON when `json` is false.
pub fn run_get(index: &TopicIndex, id: &str, json: bool) -> Result<()> {
    let topic = match get_topic(index, id) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&topic)?);
        return Ok(());
    }

    println!("--- Topic ---");
    println!("id:        {}", topic.id);
    println!("title:     {}", topic.title);
    if !topic.subtitle.is_empty() {
        println!("subtitle:  {}", topic.subtitle);
    }
    if !topic.category.is_empty() {
        println!("category:  {}", topic.category);
    }
    if !topic.tags.is_empty() {
        let tags: Vec<&str> = topic.tags.iter().map(String::as_str).collect();
        println!("tags:      {}", tags.join(", "));
    }
    println!(
        "children:  {} examples, {} resources, {} questions",
        topic.code_examples.len(),
        topic.resources.len(),
        topic.questions.len()
    );
    println!();
    println!("--- Record ---");
    println!("{}", serde_json::to_string_pretty(&topic)?);

    Ok(())
}
