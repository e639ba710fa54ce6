//! The fixed instruction sent with every photo.

/// Instruction describing the headshot transformation.
pub const PROFESSIONAL_HEADSHOT_PROMPT: &str = "\
Transform this person's appearance into a high-end professional headshot suitable for LinkedIn and GitHub.
Key requirements:
1. Replace current clothing with a perfectly tailored, sharp, and modern professional business suit (terno bem alinhado).
2. Adjust the body posture to be upright, centered, and professional.
3. Use professional studio lighting to enhance facial details.
4. Change the background to a clean, slightly blurred professional office environment or a sophisticated solid neutral color.
5. CRITICAL: Maintain the person's facial identity and features exactly.
6. Ensure the result is high resolution and looks like a real photograph.";
