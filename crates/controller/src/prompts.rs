//! Prompt templates for intent analysis and response generation.

/// Fixed instruction template for intent classification.
pub fn intent_analysis_prompt() -> String {
    let intent_types = [
        ("search_papers", "Search Papers"),
        ("get_paper_details", "Get Paper Details"),
        ("get_paper_citations", "Get Paper Citations"),
        ("search_authors", "Search Authors"),
        ("get_author_details", "Get Author Details"),
        ("get_author_papers", "Get Author Papers"),
        ("citation_network", "Citation Network Analysis"),
        ("collaboration_network", "Collaboration Network Analysis"),
        ("get_trending_papers", "Get Trending Papers"),
        ("get_top_keywords", "Get Hot Topics or Keywords"),
        ("research_trends", "Research Trend Analysis"),
        ("research_landscape", "Research Landscape Analysis"),
        ("general_chat", "General Chat"),
        ("unknown", "Unknown Intent"),
    ];
    let listing = intent_types
        .iter()
        .map(|(label, description)| format!("- {label}: {description}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are a professional academic research AI assistant who needs to analyze user query intent.\n\
         \n\
         Supported intent types include:\n\
         {listing}\n\
         \n\
         Please analyze the user's query, identify their main intent, and provide the following information:\n\
         1. Intent type (select the most matching type from above)\n\
         2. Confidence (value between 0-1)\n\
         3. Key parameters (such as search keywords, author names, etc.)\n\
         \n\
         Analysis requirements:\n\
         - Accurately identify the user's core needs\n\
         - Extract useful parameters and entities\n\
         - Mark for clarification if the intent is unclear\n\
         \n\
         Reply with a JSON object: {{\"intent_type\": ..., \"confidence\": ..., \"parameters\": {{...}}}}"
    )
}

/// Base prompt shared by every response-generation call.
fn base_response_prompt() -> &'static str {
    "You are a professional academic research AI assistant who needs to generate natural and \
     professional responses based on user queries and analysis results.\n\
     \n\
     Response requirements:\n\
     1. Natural and fluent language\n\
     2. Professional and accurate content that reflects academic research rigor\n\
     3. Clear structure with highlighted key points\n\
     4. Adjust the level of detail according to data volume\n\
     5. Provide valuable insights and suggestions\n\
     6. Maintain a friendly and helpful tone"
}

/// Strategy-specific guidance appended to the base response prompt.
fn strategy_prompt(strategy: &str) -> &'static str {
    match strategy {
        "paper_list" => {
            "For paper search results: summarize the overall results (total number, main \
             characteristics), highlight the most relevant papers, analyze the distribution by \
             time and authors, identify research hotspots, and suggest next steps."
        }
        "paper_detail" => {
            "For paper details: introduce the basic paper information (title, authors, \
             publication date), summarize the main contributions, analyze academic impact \
             (citations, importance), and suggest related research to explore."
        }
        "citation_analysis" => {
            "For citation analysis: describe the citation relationships found, highlight the \
             most influential citing and cited works, and point out notable citation patterns."
        }
        "author_list" => {
            "For author search results: summarize the number of authors found, highlight the \
             most relevant or active authors, analyze the distribution by institution and \
             research field, and identify core researchers."
        }
        "author_detail" => {
            "For author details: introduce the author's profile (affiliation, h-index, paper \
             count), summarize their research focus and collaborations, and suggest how to \
             explore their work further."
        }
        "author_papers" => {
            "For an author's paper list: summarize the body of work, highlight the most cited \
             papers, and describe how the author's research focus has evolved."
        }
        "network_analysis" => {
            "For network analysis results: describe the size and density of the network, \
             identify the key nodes, and point out notable clusters or collaboration patterns."
        }
        "trending_papers" => {
            "For trending papers: summarize the hottest papers in the window, identify the \
             common themes and most active authors, and suggest which trends to follow."
        }
        "keyword_analysis" => {
            "For keyword analysis: summarize the most popular keywords and their paper counts, \
             compare fields, and highlight emerging topics worth attention."
        }
        "clarification" => {
            "The user's intent is unclear. Politely ask what they would like to do, offering \
             the main capabilities: paper search, author lookup, citation analysis, and \
             research trends."
        }
        _ => {
            "Generate a helpful, concise reply based on the provided structured data, ensuring \
             the information is accurate and easy to understand."
        }
    }
}

/// Full response-generation prompt for one strategy.
pub fn response_generation_prompt(strategy: &str) -> String {
    format!("{}\n\n{}", base_response_prompt(), strategy_prompt(strategy))
}
