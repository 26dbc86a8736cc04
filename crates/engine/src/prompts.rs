//! Prompt templates for every generation path.
//!
//! The escalation sentinel is injected into the general-knowledge
//! template from configuration; the router detects it with the same
//! configured string. The templates are the textual contract with the
//! generative model, so changes here change routing behavior.

/// Renders prompts with the configured sentinel and bounds baked in.
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    sentinel: String,
}

impl PromptLibrary {
    pub fn new(sentinel: impl Into<String>) -> Self {
        Self {
            sentinel: sentinel.into(),
        }
    }

    /// The FAQ-grounded answer prompt.
    pub fn faq_response(&self, context: &str, history: &str, question: &str) -> String {
        format!(
            "You are a helpful customer support assistant. Your role is to provide accurate, \
             helpful, and specific information to customers based on the provided FAQ knowledge base.\n\
             \n\
             Context from FAQ knowledge base:\n{context}\n\
             \n\
             Conversation history:\n{history}\n\
             \n\
             User question: {question}\n\
             \n\
             Instructions:\n\
             1. Use the provided FAQ context to answer the user's question\n\
             2. Be specific and actionable in your response\n\
             3. If the context doesn't fully answer the question, acknowledge this and provide the best available information\n\
             4. Maintain a helpful and professional tone\n\
             5. If multiple FAQ items are relevant, synthesize them into a comprehensive answer\n\
             \n\
             Please provide a helpful response:"
        )
    }

    /// The open-domain answer prompt. Instructs the model to emit the
    /// escalation sentinel when it lacks sufficient information or the
    /// request needs internal data it cannot access.
    pub fn general_response(&self, history: &str, question: &str) -> String {
        format!(
            "You are a helpful customer support assistant. The user has asked a question that \
             may not be fully covered in our specific knowledge base.\n\
             \n\
             Conversation history:\n{history}\n\
             \n\
             User question: {question}\n\
             \n\
             Instructions:\n\
             1. Provide a helpful, general answer based on your knowledge\n\
             2. Be honest about limitations if the question requires specific internal information\n\
             3. Suggest appropriate next steps when possible\n\
             4. If the question is too specific to our business or requires access to internal systems, respond with '{sentinel}'\n\
             5. Maintain a professional and helpful tone\n\
             \n\
             Please provide a helpful response:",
            sentinel = self.sentinel,
        )
    }

    /// The conversation-summary prompt.
    pub fn conversation_summary(&self, conversation: &str, word_limit: usize) -> String {
        format!(
            "Please provide a concise summary of this customer support conversation. Focus on \
             the main issues discussed, questions asked, and solutions provided.\n\
             \n\
             Conversation:\n{conversation}\n\
             \n\
             Instructions:\n\
             1. Identify the main customer issue or question\n\
             2. Summarize the key points discussed\n\
             3. Note any solutions or recommendations provided\n\
             4. Keep the summary under {word_limit} words\n\
             5. Use clear, professional language\n\
             \n\
             Summary:"
        )
    }

    /// Short topic classification used to steer action suggestions.
    pub fn topic_analysis(&self, question: &str) -> String {
        format!(
            "Analyze this user question and identify the main topic/domain: '{question}'\n\
             \n\
             Identify the key topic (e.g., 'account management', 'password reset', 'billing', \
             'technical support', etc.)\n\
             \n\
             Respond with just the main topic in 2-3 words."
        )
    }

    /// Next-action suggestion generation.
    pub fn action_suggestions(
        &self,
        question: &str,
        topic: &str,
        history: &str,
        faq_context: &str,
        count: usize,
    ) -> String {
        format!(
            "Based on the user's question and conversation context, generate contextually \
             relevant follow-up questions and actions.\n\
             \n\
             User question: {question}\n\
             Main topic: {topic}\n\
             Conversation context: {history}\n\
             Available FAQ context: {faq_context}\n\
             \n\
             Instructions:\n\
             Generate {count} contextually relevant follow-up questions and actions that a \
             customer would likely ask next about this specific topic. Focus on:\n\
             - Natural follow-up questions related to their specific issue\n\
             - Alternative approaches to solve their problem\n\
             - Related concerns they might have\n\
             - Next steps they might need to take\n\
             \n\
             Make the suggestions sound like natural questions a real customer would ask. \
             Format as complete questions or actionable statements.\n\
             \n\
             Generate {count} relevant suggestions (one per line, no numbering):"
        )
    }
}
