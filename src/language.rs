//! Supported answer languages and the directives handed to the generator.

use serde::{Deserialize, Serialize};
use crate::{Result, RagError};

struct LanguageSpec {
    code: &'static str,
    name: &'static str,
    native_name: &'static str,
    no_information: &'static str,
}

/// Selector order; the first entry is the default.
const LANGUAGES: &[LanguageSpec] = &[
    LanguageSpec {
        code: "hi",
        name: "Hindi",
        native_name: "हिन्दी",
        no_information: "क्षमा करें, मुझे उपलब्ध योजना दस्तावेज़ों में आपके प्रश्न से संबंधित जानकारी नहीं मिली। कृपया प्रश्न को दूसरे शब्दों में पूछें या किसी विशिष्ट योजना का नाम बताएं।",
    },
    LanguageSpec {
        code: "en",
        name: "English",
        native_name: "English",
        no_information: "Sorry, I could not find information related to your question in the available scheme documents. Please rephrase your question or mention a specific scheme.",
    },
    LanguageSpec {
        code: "bn",
        name: "Bengali",
        native_name: "বাংলা",
        no_information: "দুঃখিত, উপলব্ধ প্রকল্প নথিতে আপনার প্রশ্নের সাথে সম্পর্কিত কোনো তথ্য পাওয়া যায়নি। অনুগ্রহ করে প্রশ্নটি অন্যভাবে জিজ্ঞাসা করুন বা একটি নির্দিষ্ট প্রকল্পের নাম উল্লেখ করুন।",
    },
    LanguageSpec {
        code: "te",
        name: "Telugu",
        native_name: "తెలుగు",
        no_information: "క్షమించండి, అందుబాటులో ఉన్న పథక పత్రాలలో మీ ప్రశ్నకు సంబంధించిన సమాచారం దొరకలేదు. దయచేసి మీ ప్రశ్నను మరో విధంగా అడగండి లేదా ఒక నిర్దిష్ట పథకం పేరు చెప్పండి.",
    },
    LanguageSpec {
        code: "mr",
        name: "Marathi",
        native_name: "मराठी",
        no_information: "क्षमस्व, उपलब्ध योजना दस्तऐवजांमध्ये तुमच्या प्रश्नाशी संबंधित माहिती सापडली नाही. कृपया प्रश्न वेगळ्या शब्दांत विचारा किंवा विशिष्ट योजनेचे नाव सांगा.",
    },
    LanguageSpec {
        code: "ta",
        name: "Tamil",
        native_name: "தமிழ்",
        no_information: "மன்னிக்கவும், கிடைக்கும் திட்ட ஆவணங்களில் உங்கள் கேள்விக்கு தொடர்புடைய தகவல் கிடைக்கவில்லை. தயவுசெய்து கேள்வியை வேறு விதமாகக் கேளுங்கள் அல்லது ஒரு குறிப்பிட்ட திட்டத்தின் பெயரைக் குறிப்பிடுங்கள்.",
    },
    LanguageSpec {
        code: "gu",
        name: "Gujarati",
        native_name: "ગુજરાતી",
        no_information: "માફ કરશો, ઉપલબ્ધ યોજના દસ્તાવેજોમાં તમારા પ્રશ્ન સંબંધિત માહિતી મળી નથી. કૃપા કરીને પ્રશ્ન બીજી રીતે પૂછો અથવા કોઈ ચોક્કસ યોજનાનું નામ જણાવો.",
    },
    LanguageSpec {
        code: "kn",
        name: "Kannada",
        native_name: "ಕನ್ನಡ",
        no_information: "ಕ್ಷಮಿಸಿ, ಲಭ್ಯವಿರುವ ಯೋಜನಾ ದಾಖಲೆಗಳಲ್ಲಿ ನಿಮ್ಮ ಪ್ರಶ್ನೆಗೆ ಸಂಬಂಧಿಸಿದ ಮಾಹಿತಿ ಸಿಗಲಿಲ್ಲ. ದಯವಿಟ್ಟು ಪ್ರಶ್ನೆಯನ್ನು ಬೇರೆ ರೀತಿಯಲ್ಲಿ ಕೇಳಿ ಅಥವಾ ನಿರ್ದಿಷ್ಟ ಯೋಜನೆಯ ಹೆಸರನ್ನು ತಿಳಿಸಿ.",
    },
    LanguageSpec {
        code: "ml",
        name: "Malayalam",
        native_name: "മലയാളം",
        no_information: "ക്ഷമിക്കണം, ലഭ്യമായ പദ്ധതി രേഖകളിൽ നിങ്ങളുടെ ചോദ്യവുമായി ബന്ധപ്പെട്ട വിവരങ്ങൾ കണ്ടെത്താനായില്ല. ദയവായി ചോദ്യം മറ്റൊരു രീതിയിൽ ചോദിക്കുക അല്ലെങ്കിൽ ഒരു പ്രത്യേക പദ്ധതിയുടെ പേര് പറയുക.",
    },
    LanguageSpec {
        code: "pa",
        name: "Punjabi",
        native_name: "ਪੰਜਾਬੀ",
        no_information: "ਮਾਫ਼ ਕਰਨਾ, ਉਪਲਬਧ ਯੋਜਨਾ ਦਸਤਾਵੇਜ਼ਾਂ ਵਿੱਚ ਤੁਹਾਡੇ ਸਵਾਲ ਨਾਲ ਸਬੰਧਤ ਜਾਣਕਾਰੀ ਨਹੀਂ ਮਿਲੀ। ਕਿਰਪਾ ਕਰਕੇ ਸਵਾਲ ਨੂੰ ਹੋਰ ਤਰੀਕੇ ਨਾਲ ਪੁੱਛੋ ਜਾਂ ਕਿਸੇ ਖਾਸ ਯੋਜਨਾ ਦਾ ਨਾਮ ਦੱਸੋ।",
    },
    LanguageSpec {
        code: "or",
        name: "Odia",
        native_name: "ଓଡ଼ିଆ",
        no_information: "କ୍ଷମା କରନ୍ତୁ, ଉପଲବ୍ଧ ଯୋଜନା ଦଲିଲରେ ଆପଣଙ୍କ ପ୍ରଶ୍ନ ସମ୍ବନ୍ଧୀୟ କୌଣସି ତଥ୍ୟ ମିଳିଲା ନାହିଁ। ଦୟାକରି ପ୍ରଶ୍ନଟି ଅନ୍ୟ ଭାବରେ ପଚାରନ୍ତୁ କିମ୍ବା ଏକ ନିର୍ଦ୍ଦିଷ୍ଟ ଯୋଜନାର ନାମ କୁହନ୍ତୁ।",
    },
];

/// Everything the generator needs to answer in one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageDirective {
    pub code: String,
    pub name: String,
    pub native_name: String,
    /// Fragment placed in the system prompt.
    pub instruction: String,
    /// Canned answer used when nothing relevant was retrieved.
    pub no_information_response: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub code: String,
    pub name: String,
    pub native_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry;

impl LanguageRegistry {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, language_code: &str) -> Result<LanguageDirective> {
        let code = language_code.trim().to_ascii_lowercase();
        let spec = LANGUAGES
            .iter()
            .find(|spec| spec.code == code)
            .ok_or_else(|| RagError::UnsupportedLanguage(language_code.to_string()))?;

        Ok(LanguageDirective {
            code: spec.code.to_string(),
            name: spec.name.to_string(),
            native_name: spec.native_name.to_string(),
            instruction: format!(
                "Respond only in {} ({}). Even if the source documents or the question use another \
                 language, write the entire answer in {}. Keep official scheme names such as \
                 PM-KISAN or MGNREGA in their commonly used form.",
                spec.name, spec.native_name, spec.name
            ),
            no_information_response: spec.no_information.to_string(),
        })
    }

    pub fn is_supported(&self, language_code: &str) -> bool {
        self.resolve(language_code).is_ok()
    }

    pub fn supported(&self) -> Vec<LanguageInfo> {
        LANGUAGES
            .iter()
            .map(|spec| LanguageInfo {
                code: spec.code.to_string(),
                name: spec.name.to_string(),
                native_name: spec.native_name.to_string(),
            })
            .collect()
    }

    pub fn default_code(&self) -> &'static str {
        LANGUAGES[0].code
    }
}
