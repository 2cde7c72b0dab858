//! Prompt templates for each research step

/// Reflection fallback when the model's follow-up cannot be recovered
pub fn fallback_follow_up(query: &str) -> String {
    format!("Give me further insights on **{}**", query)
}

/// Current date as written into the query-writer prompt
pub fn current_date() -> String {
    chrono::Local::now().format("%B %d, %Y").to_string()
}

// ============= Question Reformulation =============

pub const REFORMULATION_SYSTEM: &str = "\
Your task is to improve the user's question based on the previous conversation so that it can be understood on its own.
INSTRUCTIONS:
1. If the user's question refers to the previous conversation, rewrite it using that conversation so that it is fully understandable on its own.
2. If the user's question is NOT related to the previous conversation, you MUST answer with the question exactly as it was given.
3. Do not add greetings or comments to the answer.";

pub fn reformulation_user(conversation_history: &str, question: &str) -> String {
    format!(
        "####\nPrevious conversation (chat history):\n{}\n\n\n####\nUser question: '{}'\n\nStandalone reformulated question: ",
        conversation_history, question
    )
}

// ============= Query Generation =============

pub fn query_writer_system(num_queries: usize, current_date: &str, research_topic: &str) -> String {
    format!(
        r#"Your goal is to generate {n} web search queries, in addition to the user's query, that will retrieve better results than the given query alone.
The generated queries must be specific and relevant, so that they explore the user's query in more depth.

## CONTEXT
Current date: {date}
Make sure your queries take into account the most up-to-date information available at this date.

## USER QUERY
{topic}

## FORMAT
Format your answer as a JSON object with a "queries" list where every element has exactly these keys:
   - "query": The actual search string
   - "rationale": A short explanation of why this query is relevant

## EXAMPLE
Example output when the topic is 'regulatory updates on workplace health and safety':
{{
  "queries": [
    {{
      "query": "new workplace safety regulations 2025",
      "rationale": "Check for recent legislative updates on safety in the workplace"
    }},
    {{
      "query": "environmental compliance obligations for companies 2025 updates",
      "rationale": "Identify changes to environmental obligations for businesses"
    }}
  ]
}}
##

Provide your answer in JSON format:"#,
        n = num_queries,
        date = current_date,
        topic = research_topic
    )
}

pub fn query_writer_user(num_queries: usize) -> String {
    format!(
        "Generate {} additional targeted web search queries that will retrieve better results than the given query alone.",
        num_queries
    )
}

// ============= Summarization =============

pub const SUMMARIZER_SYSTEM: &str = "\
You are an assistant specialized in writing informative, detailed summaries.

# GOAL
Write a high-quality, professional summary that gives relevant and thorough answers to the user's query using the search results.

# INSTRUCTIONS
1. The summary must be complete, detailed and useful to answer the user's query.
2. Report all the information from the search results that is relevant to the user's topic.
3. Keep the summary easy to read, using bullet lists where helpful.
4. Give priority to the results listed first, as they are listed in order of importance.
5. Cite the related search results for every statement in the form [n]. A statement may carry several citations (for example [2][4]).

# TASK
Think carefully about the search results, then write a summary of the context that answers the user's input.

# FORMATTING
- Start directly with the summary, without preamble or titles. Do not use XML tags in the output.
";

pub const SUMMARIZER_EXTEND_SYSTEM: &str = "\
You are an assistant specialized in writing informative summaries.

# GOAL
Extend an existing informative summary for the user's query using new search results.

# INSTRUCTIONS
1. Read the existing summary and the new search results carefully.
2. Compare the new information with the existing summary.
3. For each search result (new information):
    a. If it relates to existing points, integrate it into the relevant paragraph, keeping the previous citations and adding citations to the new related sources.
    b. If it is entirely new but relevant, add a new paragraph with a smooth transition, citing the related sources.
    c. If it is not relevant to the user's topic, skip it.
4. Make sure every addition is relevant to the user's topic.
5. Every citation of the previous summary must be kept, never replaced, only complemented with the new sources.
6. The updated summary must be complete, detailed and strongly focused on the user's query.
7. Give priority to the results listed first, as they are listed in order of importance.
8. Check that the final summary improves on the previous one.
9. Keep the summary easy to read, using bullet lists where helpful.

# TASK
Think carefully about the search results and the previous summary, then write a summary of the context that answers the user's input.

# FORMATTING
- Start directly with the updated summary, without preamble or titles. Do not use XML tags in the output.
";

pub fn summarizer_user(user_query: &str, numbered_sources: &str) -> String {
    format!(
        "Write a summary that provides information for the following query:\n\n# USER QUERY\n{}\n\n# SOURCES (numbered by importance, number 1 is the most important)\n{}\n\nRemember to follow all the instructions in the system prompt to write a structured summary focused on the user's query.\n",
        user_query, numbered_sources
    )
}

pub fn summarizer_extend_user(
    user_query: &str,
    previous_summary: &str,
    numbered_sources: &str,
) -> String {
    format!(
        "Write a summary that provides information for the following query:\n\n# USER QUERY\n{}\n\n# PREVIOUS SUMMARY\n{}\n\n# SOURCES (numbered by importance, number 1 is the most important)\n{}\n\nRemember to follow all the instructions in the system prompt to write a new structured summary focused on the user's query.\n",
        user_query, previous_summary, numbered_sources
    )
}

// ============= Reflection =============

pub const REFLECTION_SYSTEM: &str = r#"You are an expert research assistant assessing how completely a summary answers a user's query.

<GOAL>
1. Identify knowledge gaps or areas that need deeper exploration to answer the user's query thoroughly.
2. Focus on relevant and distinctive details, specific characteristics or emerging trends that have not been fully covered.
3. Generate a follow-up question that broadens the understanding and adds important information for the user's query.
</GOAL>

<REQUIREMENTS>
Make sure the follow-up query is self-contained and includes the context needed for an effective web search.
</REQUIREMENTS>

<FORMAT>
Format your answer as a JSON object with exactly these keys:
- knowledge_gap: Describe what information is missing or needs clarification
- follow_up_query: Write a specific question that addresses this gap
</FORMAT>

<Task>
Reflect carefully on the summary to identify knowledge gaps and produce a follow-up query for the initial query.
Then produce your output following this JSON format:
{
    "knowledge_gap": "The summary lacks information about performance metrics and benchmarks",
    "follow_up_query": "What are the typical performance benchmarks and metrics used to evaluate [specific technology]?"
}
</Task>

Provide your analysis in JSON format:"#;

pub fn reflection_user(running_summary: &str, query: &str, previous_queries: &[String]) -> String {
    let previous = previous_queries
        .iter()
        .map(|q| format!("- {}", q))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Reflect on what is currently known: \n === \n {}\n === \n\nNow identify a knowledge gap and generate a follow-up web search query, keeping in mind that the initial query is:\n**{}**.\nThe new query must not resemble any of these:\n{}\n\n",
        running_summary, query, previous
    )
}

// ============= Suggestions =============

pub const SUGGESTIONS_SYSTEM: &str = r#"You are an expert content creator and user-intent analyst.
Your task is to generate new alternative and complementary queries starting from an initial query and its answer.
Analyze the content, identify the main themes and propose six new questions that a user might ask if they were interested in the same subject but with different needs or perspectives.
The generated queries **must be suitable for search engines**.

FORMAT the output as a valid JSON object with the following structure:
    {
      "original_query": "[the user's previous query]",
      "analysis": "[short analysis of the original conversation]",
      "suggestions": [
        {
          "query": "[new question or research topic]",
          "rationale": "[why this query is useful]"
        }
      ]
    }
"#;

pub fn suggestions_user(previous_query: &str, previous_answer: &str) -> String {
    format!(
        r#"
## ORIGINAL QUERY:
{query}

## GENERATED ANSWER:
{answer}

Generate 6 new queries that:
- are related to the subject covered in the answer,
- explore different angles (practical examples, deep dives, alternatives, related problems, comparisons, etc.),
- are realistic and phrased as if they came from other real users with different needs.

## ANSWER FORMAT:
Example of the desired JSON output:
```json
{{
  "original_query": "How does supervised machine learning work?",
  "analysis": "The original query is about the fundamentals of supervised machine learning, which trains models on labeled data.",
  "suggestions": [
    {{
      "query": "Main algorithms used in supervised machine learning",
      "rationale": "A user may want to explore specific algorithms such as linear regression, SVMs or decision trees."
    }},
    {{
      "query": "Difference between supervised and unsupervised machine learning",
      "rationale": "Someone who understood supervised learning may want to compare it with other techniques."
    }}
  ]
}}
```
"#,
        query = previous_query,
        answer = previous_answer
    )
}
