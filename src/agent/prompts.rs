//! Prompt templates and placeholder substitution.
//!
//! Templates carry `<placeholder>` markers that are substituted per round.
//! The response format described at the end of each template is what the
//! parser in `actions::parser` expects.

const TASK_TEMPLATE: &str = r#"You are an agent that is trained to perform some basic tasks on a smartphone. You will be given a smartphone screenshot. The interactive UI elements on the screenshot are labeled with numeric tags starting from 1. The numeric tag of each interactive element is located in the center of the element.

<human_answer_context>

You can call the following functions to control the smartphone:

1. tap(element: int)
This function is used to tap an UI element shown on the smartphone screen.
"element" is a numeric tag assigned to an UI element shown on the smartphone screen.
A simple use case can be tap(5), which taps the UI element labeled with the number 5. Always observe what appears after tapping before deciding the next action.

2. text(text_input: str)
This function is used to insert text input in an input field/box. text_input is the string you want to insert and must be wrapped with double quotation marks. A simple use case can be text("Hello, world!"), which inserts the string "Hello, world!" into the input area on the smartphone screen. This function is usually callable when you see a keyboard showing in the lower half of the screen.

3. long_press(element: int)
This function is used to long press an UI element shown on the smartphone screen.
A simple use case can be long_press(5), which long presses the UI element labeled with the number 5.

4. swipe(element: int, direction: str, dist: str)
This function is used to swipe an UI element shown on the smartphone screen, usually a scroll view or a slide bar. "direction" is a string that represents one of the four directions: up, down, left, right, and must be wrapped with double quotation marks. "dist" determines the distance of the swipe and can be one of the three options: short, medium, long. To reveal content below the current view, swipe "up"; to reveal content above, swipe "down".
A simple use case can be swipe(21, "up", "medium"), which swipes up the UI element labeled with the number 21 for a medium distance.

5. grid()
You should call this function when you find the element you want to interact with is not labeled with a numeric tag and other elements with numeric tags cannot help with the task. The function will bring up a grid overlay to divide the smartphone screen into small areas and this will give you more freedom to choose any part of the screen to tap, long press, or swipe.

6. ask_human(question: str)
Use this function ONLY when you need to ask the user for a specific value required to complete the task, such as a username, location, or any personal detail that you cannot infer from the screen. The "question" should be a clear, natural language question that will be displayed to the human user. Before asking, first tap the input field or dropdown on the screen to activate it.

<ui_document>
The task you need to complete is to <task_description>. Your past actions to proceed with this task are summarized as follows: <last_act>
Now, given the documentation and the following labeled screenshot, you need to think and call the function needed to proceed with the task. Your output should include four parts in the given format:
Observation: <Describe what you observe in the image>
Thought: <To complete the given task, what is the next step I should do>
Action: <The function call with the correct parameters to proceed with the task. If you believe the task is completed or there is nothing to be done, you should output FINISH. You cannot output anything else except a function call or FINISH in this field.>
Summary: <Summarize your past actions along with your latest action in one or two sentences. Do not include the numeric tag in your summary>
You can only take one action at a time, so please directly call the function."#;

const GRID_TEMPLATE: &str = r#"You are an agent that is trained to perform some basic tasks on a smartphone. You will be given a smartphone screenshot overlaid by a grid. The grid divides the screenshot into small square areas. Each area is labeled with an integer in the top-left corner.

<human_answer_context>

You can call the following functions to control the smartphone:

1. tap(area: int, subarea: str)
This function is used to tap a grid area shown on the smartphone screen. "area" is the integer label assigned to a grid area. "subarea" is a string representing the exact location to tap within the grid area. It can take one of the nine values: center, top-left, top, top-right, left, right, bottom-left, bottom, and bottom-right.
A simple use case can be tap(5, "center"), which taps the exact center of the grid area labeled with the number 5.

2. long_press(area: int, subarea: str)
This function is used to long press a grid area shown on the smartphone screen, with the same parameters as tap.
A simple use case can be long_press(7, "top-left"), which long presses the top left part of the grid area labeled with the number 7.

3. swipe(start_area: int, start_subarea: str, end_area: int, end_subarea: str)
This function is used to perform a swipe action on the smartphone screen from one grid location to another. The two subarea parameters can take one of the nine values: center, top-left, top, top-right, left, right, bottom-left, bottom, and bottom-right.
A simple use case can be swipe(21, "center", 25, "right"), which performs a swipe starting from the center of grid area 21 to the right part of grid area 25.

4. ask_human(question: str)
Use this function ONLY when you need to ask the user for a specific value required to complete the task that you cannot infer from the screen. The "question" should be a clear, natural language question that will be displayed to the human user.

The task you need to complete is to <task_description>. Your past actions to proceed with this task are summarized as follows: <last_act>
Now, given the following labeled screenshot, you need to think and call the function needed to proceed with the task. Your output should include four parts in the given format:
Observation: <Describe what you observe in the image>
Thought: <To complete the given task, what is the next step I should do>
Action: <The function call with the correct parameters to proceed with the task. If you believe the task is completed or there is nothing to be done, you should output FINISH. You cannot output anything else except a function call or FINISH in this field.>
Summary: <Summarize your past actions along with your latest action in one or two sentences. Do not include the grid area number in your summary>
You can only take one action at a time, so please directly call the function."#;

const EXPLORE_TEMPLATE: &str = r#"You are an agent that is trained to complete certain tasks on a smartphone. You will be given a screenshot of a smartphone app. The interactive UI elements on the screenshot are labeled with numeric tags starting from 1.

You can call the following functions to interact with those labeled elements to control the smartphone:

1. tap(element: int)
This function is used to tap an UI element shown on the smartphone screen.
A simple use case can be tap(5), which taps the UI element labeled with the number 5.

2. text(text_input: str)
This function is used to insert text input in an input field/box. text_input is the string you want to insert and must be wrapped with double quotation marks. This function is only callable when you see a keyboard showing in the lower half of the screen.

3. long_press(element: int)
This function is used to long press an UI element shown on the smartphone screen.
A simple use case can be long_press(5), which long presses the UI element labeled with the number 5.

4. swipe(element: int, direction: str, dist: str)
This function is used to swipe an UI element shown on the smartphone screen, usually a scroll view or a slide bar. "direction" is one of: up, down, left, right. "dist" is one of: short, medium, long.
A simple use case can be swipe(21, "up", "medium").

The task you need to complete is to <task_description>. Your past actions to proceed with this task are summarized as follows: <last_act>
Now, given the following labeled screenshot, you need to think and call the function needed to proceed with the task. Your output should include four parts in the given format:
Observation: <Describe what you observe in the image>
Thought: <To complete the given task, what is the next step I should do>
Action: <The function call with the correct parameters to proceed with the task. If you believe the task is completed or there is nothing to be done, you should output FINISH. You cannot output anything else except a function call or FINISH in this field.>
Summary: <Summarize your past actions along with your latest action in one or two sentences. Do not include the numeric tag in your summary>
You can only take one action at a time, so please directly call the function."#;

const REFLECT_TEMPLATE: &str = r#"I will give you screenshots of a mobile app before and after <action> the UI element labeled with the number '<ui_element>' on the first screenshot. The numeric tag of each element is located at the center of the element. The action of <action> this UI element was described as follows:
<last_act>
The action was also an attempt to proceed with a larger task, which is to <task_description>. Your job is to carefully analyze the difference between the two screenshots to determine if the action is in accord with the description above and at the same time effectively moved the task forward. Your output should be determined based on the following situations:
1. BACK
If you think the action navigated you to a page where you cannot proceed with the given task, you should go back to the previous interface. At the same time, describe the functionality of the UI element concisely in one or two sentences by observing the difference between the two screenshots. Your description should focus on the general function and never include the numeric tag of the UI element. Your output should be in the following format:
Decision: BACK
Thought: <explain why you think the last action is wrong and you should go back to the previous interface>
Documentation: <describe the function of the UI element>
2. INEFFECTIVE
If you find the action changed nothing on the screen (screenshots before and after the action are identical), you should continue to interact with other elements on the screen. Notice that if the location of the cursor changed between the two screenshots, they are not identical. Your output should be in the following format:
Decision: INEFFECTIVE
Thought: <explain why you made this decision>
3. CONTINUE
If you find the action changed something on the screen but does not reflect the action description above and did not move the given task forward, you should continue to interact with other elements on the screen. At the same time, describe the functionality of the UI element as in the BACK case. Your output should be in the following format:
Decision: CONTINUE
Thought: <explain why you think the action does not reflect the action description above and did not move the given task forward>
Documentation: <describe the function of the UI element>
4. SUCCESS
If you think the action successfully moved the task forward (even though it did not complete the task), describe the functionality of the UI element as above. Your output should be in the following format:
Decision: SUCCESS
Thought: <explain why you think the action successfully moved the task forward>
Documentation: <describe the function of the UI element>"#;

/// Recovery hint injected once per stagnation episode.
pub const STAGNATION_HINT: &str = "The screen has not changed since your last action. The \
previous action was likely ineffective. Consider swiping to reveal more content or choosing a \
different element.";

/// Context block spliced into the round after an `ask_human` answer.
pub fn human_answer_context(question: &str, answer: &str) -> String {
    format!(
        "You previously asked the human: \"{question}\"\nThe human answered: \"{answer}\"\nUse \
         this answer to proceed with the task."
    )
}

pub fn task_prompt(ui_document: &str, task: &str, last_act: &str, context: &str) -> String {
    let doc_block = if ui_document.is_empty() {
        String::new()
    } else {
        format!(
            "You also have access to the following documentation that describes the functionalities \
             of UI elements you can interact with:\n{ui_document}"
        )
    };
    TASK_TEMPLATE
        .replace("<human_answer_context>", context)
        .replace("<ui_document>", &doc_block)
        .replace("<task_description>", task)
        .replace("<last_act>", last_act)
}

pub fn grid_prompt(task: &str, last_act: &str, context: &str) -> String {
    GRID_TEMPLATE
        .replace("<human_answer_context>", context)
        .replace("<task_description>", task)
        .replace("<last_act>", last_act)
}

pub fn explore_prompt(task: &str, last_act: &str) -> String {
    EXPLORE_TEMPLATE
        .replace("<task_description>", task)
        .replace("<last_act>", last_act)
}

pub fn reflect_prompt(action: &str, ui_element: usize, last_act: &str, task: &str) -> String {
    REFLECT_TEMPLATE
        .replace("<action>", action)
        .replace("<ui_element>", &ui_element.to_string())
        .replace("<last_act>", last_act)
        .replace("<task_description>", task)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_prompt_substitutes_all_placeholders() {
        let p = task_prompt("doc block", "send a message", "None", "");
        assert!(p.contains("send a message"));
        assert!(p.contains("doc block"));
        assert!(!p.contains("<task_description>"));
        assert!(!p.contains("<ui_document>"));
        assert!(!p.contains("<last_act>"));
        assert!(!p.contains("<human_answer_context>"));
    }

    #[test]
    fn empty_documentation_omits_the_doc_preamble() {
        let p = task_prompt("", "t", "None", "");
        assert!(!p.contains("following documentation"));
    }

    #[test]
    fn reflect_prompt_substitutes_repeated_action_marker() {
        let p = reflect_prompt("tapping", 4, "tapped the send button", "send a message");
        assert!(!p.contains("<action>"));
        assert!(p.contains("after tapping the UI element labeled with the number '4'"));
    }

    #[test]
    fn human_context_carries_question_and_answer() {
        let ctx = human_answer_context("What is the first name?", "Ada");
        assert!(ctx.contains("What is the first name?"));
        assert!(ctx.contains("Ada"));
        let p = grid_prompt("t", "None", &ctx);
        assert!(p.contains("Ada"));
    }
}
